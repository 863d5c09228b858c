//! End-to-end fixtures exercising the full load → parse → evaluate →
//! serialize pipeline through `xform::run`, one per worked scenario.

use std::io::Write;

#[test]
fn identity_style_constructor() {
    let xml = "<root><a/></root>";
    let module = "xform version '2.0'; <out>{'ok'}</out>";
    let output = xform::run(xml, module).unwrap();
    assert_eq!(output, "<out>ok</out>");
}

#[test]
fn path_with_predicate() {
    let xml = r#"<data><item id="1"/><item id="2"/></data>"#;
    let module = r#"/data/item[attr(., "id")="2"]"#;
    let output = xform::run(xml, module).unwrap();
    assert_eq!(output, r#"<item id="2"/>"#);
}

#[test]
fn for_where_with_positional_builtins() {
    let xml = "<root/>";
    let module = "for n in seq(1,2,3) where n > 1 return seq(position(), last())";
    let output = xform::run(xml, module).unwrap();
    assert_eq!(output, "2333");
}

#[test]
fn group_by_sort_lookup_pipeline() {
    let xml = r#"<data>
        <item><category>b</category><value>1</value></item>
        <item><category>a</category><value>2</value></item>
        <item><category>a</category><value>3</value></item>
    </data>"#;
    let module = r#"
        def catKey(i) := string(i/category/text());
        def groupKey(g) := string(lookup(g, "key"));
        let items := .//item in
          <report total={count(items)}>
            {for g in sort(groupBy(items, catKey), groupKey) return
              <group name={groupKey(g)} count={count(lookup(g,"items"))} />}
          </report>
    "#;
    let output = xform::run(xml, module).unwrap();
    assert_eq!(
        output,
        r#"<report total="3"><group name="a" count="2"/><group name="b" count="1"/></report>"#
    );
}

#[test]
fn match_default_then_missing_default_errors() {
    let xml = "<root/>";
    let ok_module = "match seq('a','b'): case _ => 'ok'; default => 'x';";
    assert_eq!(xform::run(xml, ok_module).unwrap(), "okok");

    let failing_module = "match seq('a','b'): case node() => 'ok';";
    assert!(xform::run(xml, failing_module).is_err());
}

#[test]
fn rule_dispatch_then_unmatched_item_errors() {
    let xml = "<root><child/><child/></root>";
    let module = "rule main match <child>{v} := 'ok'; apply(/root/child)";
    assert_eq!(xform::run(xml, module).unwrap(), "okok");

    let xml_with_other = "<root><child/><other/></root>";
    let module_apply_all_children = "rule main match <child>{v} := 'ok'; apply(/root/*)";
    assert!(xform::run(xml_with_other, module_apply_all_children).is_err());
}

#[test]
fn cli_pipeline_reads_real_files_via_tempfile() {
    let mut xml_file = tempfile::NamedTempFile::new().unwrap();
    write!(xml_file, "<root><a/></root>").unwrap();
    let mut module_file = tempfile::NamedTempFile::new().unwrap();
    write!(module_file, "<out>{{'ok'}}</out>").unwrap();

    let xml_source = std::fs::read_to_string(xml_file.path()).unwrap();
    let module_source = std::fs::read_to_string(module_file.path()).unwrap();
    let output = xform::run(&xml_source, &module_source).unwrap();
    assert_eq!(output, "<out>ok</out>");
}
