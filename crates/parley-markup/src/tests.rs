use super::*;

fn text(s: &str) -> MarkupNode {
    MarkupNode::Text(s.to_string())
}

fn link(label: &str, url: &str) -> ButtonLink {
    ButtonLink {
        label: label.to_string(),
        url: url.to_string(),
    }
}

fn select(placeholder: &str, options: &[&str]) -> SelectMenu {
    SelectMenu {
        placeholder: placeholder.to_string(),
        options: options.iter().map(|o| o.to_string()).collect(),
        min_values: 1,
        max_values: 2,
        disabled: false,
        id: None,
    }
}

#[test]
fn round_trip_without_styled_buttons() {
    let tree = vec![
        text("Intro line"),
        MarkupNode::Container(vec![
            text("Inside"),
            MarkupNode::Section(Section {
                accessory: Accessory::Thumbnail(Thumbnail {
                    url: "https://img/cat.png".into(),
                    description: Some("a cat".into()),
                    spoiler: false,
                }),
                children: vec![
                    text("Cat facts"),
                    MarkupNode::Section(Section {
                        accessory: Accessory::Link(link("More", "https://cats")),
                        children: vec![text("nested section")],
                    }),
                ],
            }),
            MarkupNode::Separator(SeparatorSize::Small),
            MarkupNode::MediaGallery(vec![
                MediaItem {
                    url: "https://img/1.png".into(),
                    description: Some("first".into()),
                    spoiler: false,
                },
                MediaItem {
                    url: "https://img/2.png".into(),
                    description: None,
                    spoiler: true,
                },
            ]),
            MarkupNode::ActionRow(vec![MarkupNode::Select(select("Pick", &["Tea", "Coffee"]))]),
            MarkupNode::ActionRow(vec![
                MarkupNode::ButtonLink(link("A", "https://a")),
                MarkupNode::ButtonLink(link("B", "https://b")),
            ]),
            MarkupNode::Container(vec![text("deeper")]),
        ]),
        MarkupNode::Separator(SeparatorSize::Large),
        text("Outro"),
    ];

    let encoded = serialize(&tree);
    assert_eq!(parse(&encoded), tree);
    for node in &tree {
        assert!(node.validate().is_ok());
    }
}

#[test]
fn same_offset_prefers_earlier_rule() {
    let nodes = parse("[#SectionButton#Docs](btu|https://d)\nbody\n[/Section/]");
    assert_eq!(
        nodes,
        vec![MarkupNode::Section(Section {
            accessory: Accessory::Link(link("Docs", "https://d")),
            children: vec![text("body")],
        })]
    );

    // Without a closing marker only the inline rule can match.
    let nodes = parse("[#SectionButton#Docs](btu|https://d) body");
    assert_eq!(
        nodes,
        vec![
            MarkupNode::ButtonLink(link("#SectionButton#Docs", "https://d")),
            text("body"),
        ]
    );
}

#[test]
fn smaller_offset_wins_over_priority() {
    let nodes = parse("[#Separator#1] then [#Container#]x[/Container/]");
    assert_eq!(
        nodes,
        vec![
            MarkupNode::Separator(SeparatorSize::Small),
            text("then"),
            MarkupNode::Container(vec![text("x")]),
        ]
    );
}

#[test]
fn surrounding_text_is_trimmed() {
    assert_eq!(
        parse("  Hello [site](btu|https://x) world  "),
        vec![
            text("Hello"),
            MarkupNode::ButtonLink(link("site", "https://x")),
            text("world"),
        ]
    );
    assert!(parse("").is_empty());
    assert!(parse(" \n\t ").is_empty());
}

#[test]
fn styled_button_parses_but_does_not_reparse() {
    let nodes = parse("[Go](bts|ButtonStyle.success|1)");
    let button = Button {
        label: "Go".into(),
        style: ButtonStyle::Success,
        disabled: true,
        id: None,
    };
    assert_eq!(nodes, vec![MarkupNode::Button(button.clone())]);

    let encoded = serialize(&nodes);
    assert_eq!(encoded, "[Go](bts|success|1|\\)\n");
    assert_eq!(parse(&encoded), vec![text("[Go](bts|success|1|\\)")]);
}

#[test]
fn select_wrapping_depends_on_scope() {
    let top = parse("[Pick](st|Tea,Coffee|1|2|0)");
    assert_eq!(
        top,
        vec![MarkupNode::ActionRow(vec![MarkupNode::Select(select(
            "Pick",
            &["Tea", "Coffee"]
        ))])]
    );

    let inside = parse("[#ActionRow#]\n[Pick](st|Tea,Coffee|1|2|0)\n[/ActionRow/]");
    assert_eq!(top, inside);
}

#[test]
fn media_items_always_live_in_a_gallery() {
    assert_eq!(
        parse("[](media|https://img/x.png|1)"),
        vec![MarkupNode::MediaGallery(vec![MediaItem {
            url: "https://img/x.png".into(),
            description: None,
            spoiler: true,
        }])]
    );

    let gallery = parse("[#MediaGallery#]\nstray words\n[a](media|https://1|0)\n[/MediaGallery/]");
    assert_eq!(
        gallery,
        vec![MarkupNode::MediaGallery(vec![MediaItem {
            url: "https://1".into(),
            description: Some("a".into()),
            spoiler: false,
        }])]
    );
}

#[test]
fn unclosed_block_is_text() {
    assert_eq!(
        parse("[#Container#] never closed"),
        vec![text("[#Container#] never closed")]
    );
}

#[test]
fn section_button_accessory() {
    let nodes = parse("[#SectionButton#Vote](bts|danger|0)\nBody\n[/Section/]");
    assert_eq!(
        nodes,
        vec![MarkupNode::Section(Section {
            accessory: Accessory::Button(Button {
                label: "Vote".into(),
                style: ButtonStyle::Danger,
                disabled: false,
                id: None,
            }),
            children: vec![text("Body")],
        })]
    );
}
