use xml_element::{Document, Element, Node};

#[test]
fn test_escape() {
    let mut doc = Document::new("root").unwrap();
    let root = doc.root();
    root.set_attribute(&mut doc, "attr", "><&\"'attrval").unwrap();
    root.add_child(&mut doc, "inner", Some("><&\"'text")).unwrap();
    root.push_child(&mut doc, Node::Comment("<&amp;".to_string()))
        .unwrap();
    root.push_child(&mut doc, Node::CData("<&amp;".to_string()))
        .unwrap();
    let xml = root.write_str(&doc).unwrap();

    assert_eq!(
        xml,
        r#"<root attr="&gt;&lt;&amp;&quot;&apos;attrval"><inner>&gt;&lt;&amp;&quot;&apos;text</inner><!--<&amp;--><![CDATA[<&amp;]]></root>"#
    );

    // another parser reads the values back unchanged
    let parsed = roxmltree::Document::parse(&xml).unwrap();
    let parsed_root = parsed.root_element();
    assert_eq!(parsed_root.attribute("attr"), Some("><&\"'attrval"));
    let inner = parsed_root.first_element_child().unwrap();
    assert_eq!(inner.text(), Some("><&\"'text"));
}

#[test]
fn test_write_document() {
    let mut doc = Document::new("root").unwrap();
    let root = doc.root();
    root.add_child(&mut doc, "a", None).unwrap();
    assert_eq!(
        doc.write_str().unwrap(),
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<root>\n    <a/>\n</root>"
    );
}

#[test]
fn test_write_keeps_declaration_data() {
    let doc = Document::parse_str("<?xml version=\"1.1\" standalone=\"yes\"?><r/>").unwrap();
    let xml = doc.write_str().unwrap();
    assert!(xml.starts_with(
        "<?xml version=\"1.1\" encoding=\"UTF-8\" standalone=\"yes\"?>"
    ));
}

fn names(doc: &roxmltree::Document, path: &[&str]) -> Vec<String> {
    let mut node = doc.root_element();
    for step in path {
        node = node
            .children()
            .find(|c| c.is_element() && c.tag_name().name() == *step)
            .unwrap();
    }
    node.children()
        .filter(|c| c.is_element())
        .map(|c| c.tag_name().name().to_string())
        .collect()
}

#[test]
fn test_save_after_edit() {
    let mut doc = Document::parse_str(
        r#"<config><server port="80"/><cache size="10"><entry/></cache></config>"#,
    )
    .unwrap();
    let root = doc.root();
    root.remove_node(&mut doc, Some("cache/entry")).unwrap();
    let server = root.xpath_nth(&doc, "server", 0).unwrap().unwrap();
    server.add_child_cdata(&mut doc, "banner", "<hello>").unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.xml");
    doc.save(&path).unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    let parsed = roxmltree::Document::parse(&written).unwrap();
    assert_eq!(names(&parsed, &[]), vec!["server", "cache"]);
    assert!(names(&parsed, &["cache"]).is_empty());
    assert_eq!(names(&parsed, &["server"]), vec!["banner"]);

    // and it loads back through the `.xml` suffix
    let mut log = xml_element::ErrorLog::new();
    let reloaded = xml_element::load(path.to_str().unwrap(), false, &mut log).unwrap();
    let banner: Element = reloaded
        .root()
        .xpath_nth(&reloaded, "server/banner", 0)
        .unwrap()
        .unwrap();
    assert_eq!(banner.text(&reloaded).trim(), "<hello>");
}

#[test]
fn test_save_to_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let doc = Document::new("r").unwrap();
    let err = doc.save(dir.path().join("no/such/dir/out.xml")).unwrap_err();
    assert!(matches!(err, xml_element::Error::Io(_)));
}

#[test]
fn test_parsed_attribute_written_escaped() {
    let doc = Document::parse_str(r#"<r a="&lt;&quot;&amp;"/>"#).unwrap();
    let xml = doc.root().write_str(&doc).unwrap();
    assert_eq!(xml, r#"<r a="&lt;&quot;&amp;"/>"#);
    let reparsed = Document::parse_str(&xml).unwrap();
    assert_eq!(reparsed.root().attribute(&reparsed, "a"), Some("<\"&"));
}

#[test]
fn test_cdata_terminator_is_split() {
    let mut doc = Document::new("r").unwrap();
    let root = doc.root();
    root.add_cdata(&mut doc, "a]]>b").unwrap();
    let xml = root.write_str(&doc).unwrap();
    assert_eq!(xml, "<r><![CDATA[a]]]]><![CDATA[>b]]></r>");

    let reparsed = Document::parse_str(&xml).unwrap();
    assert_eq!(reparsed.root().text(&reparsed), "a]]>b");
    let parsed = roxmltree::Document::parse(&xml).unwrap();
    assert_eq!(
        parsed
            .root_element()
            .children()
            .filter_map(|c| c.text())
            .collect::<String>(),
        "a]]>b"
    );
}
