use xml_element::editor;
use xml_element::{
    load, Document, Element, Error, ErrorLevel, ErrorLog, FlattenMode, Key, Value, XmlTree,
};

fn child_names(doc: &Document, elem: Element) -> Vec<&str> {
    elem.child_elements(doc)
        .into_iter()
        .map(|c| c.name(doc))
        .collect()
}

fn load_ok(xml: &str) -> Document {
    let mut log = ErrorLog::new();
    load(xml, false, &mut log).unwrap()
}

#[test]
fn test_round_trip_append() {
    let mut log = ErrorLog::new();
    let mut doc = load(r#"<root><item id="1">x</item></root>"#, false, &mut log).unwrap();
    let root = doc.root();
    let extra = root.append_str(&mut doc, "<extra>5</extra>", &mut log).unwrap();
    assert_eq!(extra.parent(&doc), Some(root));

    let written = root.write_str(&doc).unwrap();
    let reloaded = load(&written, false, &mut log).unwrap();
    let root = reloaded.root();
    assert_eq!(child_names(&reloaded, root), vec!["item", "extra"]);
    let extra = root.xpath_nth(&reloaded, "extra", 0).unwrap().unwrap();
    assert_eq!(extra.text(&reloaded), "5");
}

#[test]
fn test_append_branches() {
    let source = load_ok(
        r#"<wrap kind="w">
            <leaf a="1"> text <dropped/> </leaf>
            <branch b="2"><inner/></branch>
        </wrap>"#,
    );
    let before = source.root().write_str(&source).unwrap();
    let mut doc = load_ok("<root/>");
    let root = doc.root();
    let new = root.append_from(&mut doc, &source, source.root()).unwrap();

    // whitespace-only text counts as empty
    assert_eq!(new.name(&doc), "wrap");
    assert_eq!(new.attribute(&doc, "kind"), Some("w"));
    assert_eq!(child_names(&doc, new), vec!["leaf", "branch"]);

    let leaf = new.child_elements(&doc)[0];
    assert_eq!(leaf.text(&doc), "text");
    assert!(leaf.child_elements(&doc).is_empty());
    assert_eq!(leaf.attribute(&doc, "a"), Some("1"));

    let branch = new.child_elements(&doc)[1];
    assert_eq!(child_names(&doc, branch), vec!["inner"]);
    assert_eq!(branch.attribute(&doc, "b"), Some("2"));

    // source unchanged
    assert_eq!(source.root().write_str(&source).unwrap(), before);
    assert_eq!(child_names(&source, source.root()), vec!["leaf", "branch"]);
    let source_leaf = source.root().child_elements(&source)[0];
    assert_eq!(child_names(&source, source_leaf), vec!["dropped"]);
}

#[test]
fn test_append_within_same_document() {
    let mut doc = load_ok("<root><a><b/></a><c/></root>");
    let root = doc.root();
    let a = root.xpath_nth(&doc, "a", 0).unwrap().unwrap();
    let c = root.xpath_nth(&doc, "c", 0).unwrap().unwrap();
    let copy = c.append(&mut doc, a).unwrap();
    assert_ne!(copy, a);
    assert_eq!(
        root.write_str(&doc).unwrap(),
        "<root><a><b/></a><c><a><b/></a></c></root>"
    );
}

#[test]
fn test_append_ancestor_into_descendant() {
    let mut doc = load_ok("<root><a/></root>");
    let root = doc.root();
    let a = root.child_elements(&doc)[0];
    // copied as it was before the append
    a.append(&mut doc, root).unwrap();
    assert_eq!(
        root.write_str(&doc).unwrap(),
        "<root><a><root><a/></root></a></root>"
    );
}

#[test]
fn test_append_str_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("part.xml");
    std::fs::write(&path, r#"<part no="7"><name>bolt</name></part>"#).unwrap();

    let mut log = ErrorLog::new();
    let mut doc = load_ok("<order/>");
    let root = doc.root();
    let part = root
        .append_str(&mut doc, path.to_str().unwrap(), &mut log)
        .unwrap();
    assert_eq!(part.attribute(&doc, "no"), Some("7"));
    assert_eq!(
        part.xpath_nth(&doc, "name", 0)
            .unwrap()
            .unwrap()
            .text(&doc),
        "bolt"
    );
}

#[test]
fn test_remove_node() {
    let mut doc = load_ok("<r><a><x/></a><b><x/><x/></b><c/></r>");
    let root = doc.root();

    // no match is a no-op returning the target
    assert_eq!(root.remove_node(&mut doc, Some("//missing")).unwrap(), root);
    assert_eq!(doc.root().xpath(&doc, "//*").unwrap().len(), 7);

    // k matches remove k nodes, each from its own parent
    assert_eq!(root.remove_node(&mut doc, Some("//x")).unwrap(), root);
    assert_eq!(root.write_str(&doc).unwrap(), "<r><a/><b/><c/></r>");

    let c = root.xpath_nth(&doc, "c", 0).unwrap().unwrap();
    assert_eq!(c.remove_node(&mut doc, None).unwrap(), c);
    assert!(!c.has_parent(&doc));
    assert_eq!(child_names(&doc, root), vec!["a", "b"]);
}

#[test]
fn test_remove_node_errors_do_not_mutate() {
    let mut doc = load_ok("<r><a/><b/></r>");
    let root = doc.root();
    let before = root.write_str(&doc).unwrap();

    let err = root.remove_node(&mut doc, Some("a[")).unwrap_err();
    assert!(matches!(err, Error::InvalidQuery { .. }));
    assert_eq!(root.write_str(&doc).unwrap(), before);

    assert_eq!(
        root.remove_node(&mut doc, Some("/r | a")).unwrap_err(),
        Error::RootCannotMove
    );
    assert_eq!(root.write_str(&doc).unwrap(), before);

    assert_eq!(
        root.remove_node(&mut doc, None).unwrap_err(),
        Error::RootCannotMove
    );
}

#[test]
fn test_to_array() {
    let doc = load_ok("<a><b/><c/></a>");
    let arr = doc.root().to_array(&doc, FlattenMode::default());
    let keys: Vec<String> = arr.keys().map(|k| k.to_string()).collect();
    assert_eq!(keys, vec!["b", "c"]);
    assert!(arr.map("b").unwrap().is_empty());
    assert!(arr.map("c").unwrap().is_empty());

    let leaf = load_ok("<a>only text</a>");
    assert!(leaf.root().to_array(&leaf, FlattenMode::Parity).is_empty());

    let one = load_ok("<r><a><b/></a></r>");
    let corrected = one.root().to_array(&one, FlattenMode::Corrected);
    assert_eq!(corrected.len(), 1);
    assert_eq!(
        corrected.get("a"),
        Some(&Value::Map(one.root().child_elements(&one)[0].to_array(&one, FlattenMode::Corrected)))
    );
}

#[test]
fn test_to_array_parity_quirks() {
    let doc = load_ok(r#"<r><a k="v"><b/></a><a><c/></a></r>"#);
    let arr = doc.root().to_array(&doc, FlattenMode::Parity);
    assert_eq!(arr.len(), 1);
    let a = arr.map("a").unwrap();
    let keys: Vec<String> = a.keys().map(|k| k.to_string()).collect();
    // the second <a> wins, attributes are gone, and a copy sits under 0
    assert_eq!(keys, vec!["c", "0"]);
    assert!(a.get("k").is_none());
    let copy = a.get_key(&Key::Position(0)).and_then(Value::as_map).unwrap();
    assert!(copy.map("c").unwrap().is_empty());
}

#[test]
fn test_cdata_helpers() {
    let mut doc = load_ok("<r/>");
    let root = doc.root();
    assert_eq!(root.add_cdata(&mut doc, "a < b").unwrap(), root);
    assert_eq!(
        root.add_child_cdata(&mut doc, "script", "if (x && y) {}")
            .unwrap(),
        root
    );
    assert_eq!(
        root.write_str(&doc).unwrap(),
        "<r><![CDATA[a < b]]><script><![CDATA[if (x && y) {}]]></script></r>"
    );
    let script = root.xpath_nth(&doc, "script", 0).unwrap().unwrap();
    assert_eq!(script.text(&doc), "if (x && y) {}");
}

#[test]
fn test_load_dispatch_and_log() {
    let mut log = ErrorLog::new();
    log.use_internal_errors(true);

    // a `.xml` suffix is always a path
    let err = load("missing.xml", true, &mut log).unwrap_err();
    let record = err.record().unwrap();
    assert!(record.message.contains("missing.xml"));
    assert_eq!(log.errors().len(), 1);
    assert_eq!(log.last_error(), Some(record));

    // anything else is xml text
    let err = load("<a><b></a>", true, &mut log).unwrap_err();
    assert_eq!(err.record().unwrap().level, ErrorLevel::Fatal);
    assert_eq!(log.errors().len(), 2);
    assert!(log.is_collecting());

    // success applies the requested mode, which clears the log
    load("<ok/>", false, &mut log).unwrap();
    assert!(!log.is_collecting());
    assert!(log.errors().is_empty());

    // immediate mode keeps nothing
    assert!(load("<broken", false, &mut log).is_err());
    assert!(log.errors().is_empty());

    assert!(!log.use_internal_errors(true));
    log.clear_errors();
    assert!(log.last_error().is_none());
}

#[test]
fn test_generic_over_tree() {
    fn count_elements<T: XmlTree>(tree: &T, node: T::Node) -> usize {
        1 + tree
            .child_nodes(node)
            .into_iter()
            .map(|c| count_elements(tree, c))
            .sum::<usize>()
    }

    let mut doc = load_ok("<r><a/></r>");
    let root = doc.root();
    let a = editor::xpath_nth(&doc, root, "a", 0).unwrap().unwrap();
    editor::add_child_cdata(&mut doc, a, "c", "1").unwrap();
    editor::append_within(&mut doc, a, root).unwrap();
    assert_eq!(count_elements(&doc, root), 5);
}

#[test]
fn test_load_with_declaration() {
    let mut log = ErrorLog::new();
    let doc = load("<?xml version=\"1.0\"?><root><a/></root>", false, &mut log).unwrap();
    assert_eq!(child_names(&doc, doc.root()), vec!["a"]);
}

#[test]
fn test_save_then_load_by_suffix() {
    let mut doc = load_ok("<root/>");
    let root = doc.root();
    root.add_child_cdata(&mut doc, "c", "x]]>y").unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("saved.xml");
    doc.save(&path).unwrap();

    let mut log = ErrorLog::new();
    let reloaded = editor::load(path.to_str().unwrap(), true, &mut log).unwrap();
    let c = reloaded
        .root()
        .xpath_nth(&reloaded, "c", 0)
        .unwrap()
        .unwrap();
    assert_eq!(c.text(&reloaded), "x]]>y");
    assert!(log.errors().is_empty());
}

#[test]
fn test_append_keeps_special_characters() {
    let source = load_ok(r#"<s q="&lt;&quot;"><![CDATA[<two>]]></s>"#);
    let mut doc = load_ok("<root/>");
    let root = doc.root();
    let new = root.append_from(&mut doc, &source, source.root()).unwrap();
    assert_eq!(new.text(&doc), "<two>");
    assert_eq!(new.attribute(&doc, "q"), Some("<\""));
    let written = root.write_str(&doc).unwrap();
    assert_eq!(
        written,
        r#"<root><s q="&lt;&quot;">&lt;two&gt;</s></root>"#
    );
    assert!(Document::parse_str(&written).is_ok());
}

#[test]
fn test_append_no_break_space_is_text() {
    let mut log = ErrorLog::new();
    let mut doc = load_ok("<root/>");
    let root = doc.root();
    let new = root
        .append_str(&mut doc, "<n>&#160;<kept/></n>", &mut log)
        .unwrap();
    assert_eq!(new.text(&doc), "\u{a0}");
    assert!(new.child_elements(&doc).is_empty());
}

#[test]
fn test_append_str_switches_log_to_immediate() {
    let mut log = ErrorLog::new();
    let mut doc = load("<root/>", true, &mut log).unwrap();
    assert!(log.is_collecting());
    let root = doc.root();
    root.append_str(&mut doc, "<x/>", &mut log).unwrap();
    assert!(!log.is_collecting());
}

#[test]
fn test_text_matches_stand_for_parent() {
    let mut doc = load_ok("<r><t>a</t><u/></r>");
    let root = doc.root();
    let t = root.xpath_nth(&doc, "//t/text()", 0).unwrap().unwrap();
    assert_eq!(t.name(&doc), "t");
    root.remove_node(&mut doc, Some("//t/text()")).unwrap();
    assert_eq!(root.write_str(&doc).unwrap(), "<r><u/></r>");
}
