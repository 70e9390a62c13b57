use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};

use crate::geometry::{Rect, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutErrorCode {
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    UnknownElement,
    UnknownAttribute,
    MissingElement,
    DuplicateElement,
    MissingAttribute,
    InvalidValue,
    DuplicateName,
}

#[derive(Debug, Clone)]
pub struct LayoutError {
    pub code: LayoutErrorCode,
    pub message: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (file={}, line={}, column={})",
                self.code,
                self.message,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (file={})",
                self.code,
                self.message,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for LayoutError {}

/// Screen layout: the arena, Buddy's body and the pages of panels shown in it.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutDef {
    pub arena: Rect,
    pub buddy: BuddyDef,
    /// Panels visible on every page.
    pub global_panels: Vec<PanelDef>,
    pub pages: Vec<PageDef>,
}

impl LayoutDef {
    pub fn page(&self, name: &str) -> Option<&PageDef> {
        self.pages.iter().find(|page| page.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuddyDef {
    pub half_extents: Vec2,
    pub spawn: Vec2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PanelDef {
    pub name: String,
    pub bounds: Rect,
    pub collidable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageDef {
    pub name: String,
    /// `false` pauses wandering while the page is active.
    pub allows_wander: bool,
    pub panels: Vec<PanelDef>,
}

pub fn load_layout(path: &Path) -> Result<LayoutDef, LayoutError> {
    let raw = fs::read_to_string(path).map_err(|source| LayoutError {
        code: LayoutErrorCode::ReadFile,
        message: format!("failed to read layout file: {source}"),
        file_path: path.to_path_buf(),
        location: None,
    })?;
    parse_layout(path, &raw)
}

pub fn parse_layout(file_path: &Path, raw: &str) -> Result<LayoutDef, LayoutError> {
    let doc = Document::parse(raw).map_err(|error| LayoutError {
        code: LayoutErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })?;
    let ctx = DocContext {
        file_path,
        doc: &doc,
    };

    let root = doc.root_element();
    if root.tag_name().name() != "Layout" {
        return Err(ctx.error_at(
            LayoutErrorCode::InvalidRoot,
            "root element must be <Layout>".to_string(),
            root,
        ));
    }

    let mut arena: Option<Rect> = None;
    let mut buddy_node: Option<Node<'_, '_>> = None;
    let mut global_panels = Vec::<PanelDef>::new();
    let mut pages = Vec::<PageDef>::new();
    let mut page_names = HashSet::<String>::new();
    let mut panel_names = HashSet::<String>::new();

    for child in root.children().filter(|node| node.is_element()) {
        match child.tag_name().name() {
            "Arena" => {
                if arena.is_some() {
                    return Err(ctx.error_at(
                        LayoutErrorCode::DuplicateElement,
                        "<Layout> may contain only one <Arena>".to_string(),
                        child,
                    ));
                }
                arena = Some(parse_arena(&ctx, child)?);
            }
            "Buddy" => {
                if buddy_node.is_some() {
                    return Err(ctx.error_at(
                        LayoutErrorCode::DuplicateElement,
                        "<Layout> may contain only one <Buddy>".to_string(),
                        child,
                    ));
                }
                buddy_node = Some(child);
            }
            "Panel" => {
                global_panels.push(parse_panel(&ctx, child, &mut panel_names)?);
            }
            "Page" => {
                let page = parse_page(&ctx, child, &mut panel_names)?;
                if !page_names.insert(page.name.clone()) {
                    return Err(ctx.error_at(
                        LayoutErrorCode::DuplicateName,
                        format!("duplicate page name '{}'", page.name),
                        child,
                    ));
                }
                pages.push(page);
            }
            other => {
                return Err(ctx.error_at(
                    LayoutErrorCode::UnknownElement,
                    format!("unknown element <{other}> in <Layout>"),
                    child,
                ))
            }
        }
    }

    let Some(arena) = arena else {
        return Err(ctx.error_at(
            LayoutErrorCode::MissingElement,
            "missing required element <Arena>".to_string(),
            root,
        ));
    };
    let Some(buddy_node) = buddy_node else {
        return Err(ctx.error_at(
            LayoutErrorCode::MissingElement,
            "missing required element <Buddy>".to_string(),
            root,
        ));
    };
    if pages.is_empty() {
        return Err(ctx.error_at(
            LayoutErrorCode::MissingElement,
            "<Layout> must declare at least one <Page>".to_string(),
            root,
        ));
    }
    let buddy = parse_buddy(&ctx, buddy_node, arena)?;

    Ok(LayoutDef {
        arena,
        buddy,
        global_panels,
        pages,
    })
}

struct DocContext<'a, 'input> {
    file_path: &'a Path,
    doc: &'a Document<'input>,
}

impl DocContext<'_, '_> {
    fn error_at(&self, code: LayoutErrorCode, message: String, node: Node<'_, '_>) -> LayoutError {
        let pos = self.doc.text_pos_at(node.range().start);
        LayoutError {
            code,
            message,
            file_path: self.file_path.to_path_buf(),
            location: Some(SourceLocation {
                line: pos.row as usize,
                column: pos.col as usize,
            }),
        }
    }

    fn reject_unknown_attributes(
        &self,
        node: Node<'_, '_>,
        allowed: &[&str],
    ) -> Result<(), LayoutError> {
        for attribute in node.attributes() {
            if !allowed.contains(&attribute.name()) {
                return Err(self.error_at(
                    LayoutErrorCode::UnknownAttribute,
                    format!(
                        "unknown attribute '{}' on <{}>",
                        attribute.name(),
                        node.tag_name().name()
                    ),
                    node,
                ));
            }
        }
        Ok(())
    }

    fn required_name(&self, node: Node<'_, '_>) -> Result<String, LayoutError> {
        let value = node.attribute("name").map(str::trim).unwrap_or_default();
        if value.is_empty() {
            return Err(self.error_at(
                LayoutErrorCode::MissingAttribute,
                format!("<{}> requires a non-empty 'name'", node.tag_name().name()),
                node,
            ));
        }
        Ok(value.to_string())
    }

    fn required_number(&self, node: Node<'_, '_>, attribute: &str) -> Result<f32, LayoutError> {
        match self.optional_number(node, attribute)? {
            Some(value) => Ok(value),
            None => Err(self.error_at(
                LayoutErrorCode::MissingAttribute,
                format!(
                    "missing required attribute '{}' on <{}>",
                    attribute,
                    node.tag_name().name()
                ),
                node,
            )),
        }
    }

    fn optional_number(
        &self,
        node: Node<'_, '_>,
        attribute: &str,
    ) -> Result<Option<f32>, LayoutError> {
        let Some(raw) = node.attribute(attribute) else {
            return Ok(None);
        };
        let parsed = raw.trim().parse::<f32>().map_err(|_| {
            self.error_at(
                LayoutErrorCode::InvalidValue,
                format!("{attribute} '{raw}' is not a valid number"),
                node,
            )
        })?;
        if !parsed.is_finite() {
            return Err(self.error_at(
                LayoutErrorCode::InvalidValue,
                format!("{attribute} must be finite"),
                node,
            ));
        }
        Ok(Some(parsed))
    }

    fn positive_number(&self, node: Node<'_, '_>, attribute: &str) -> Result<f32, LayoutError> {
        let value = self.required_number(node, attribute)?;
        if value <= 0.0 {
            return Err(self.error_at(
                LayoutErrorCode::InvalidValue,
                format!("{attribute} must be > 0"),
                node,
            ));
        }
        Ok(value)
    }

    fn optional_bool(
        &self,
        node: Node<'_, '_>,
        attribute: &str,
        default: bool,
    ) -> Result<bool, LayoutError> {
        match node.attribute(attribute).map(str::trim) {
            None => Ok(default),
            Some("true") => Ok(true),
            Some("false") => Ok(false),
            Some(other) => Err(self.error_at(
                LayoutErrorCode::InvalidValue,
                format!("invalid {attribute} '{other}'; allowed values: true, false"),
                node,
            )),
        }
    }
}

fn parse_arena(ctx: &DocContext<'_, '_>, node: Node<'_, '_>) -> Result<Rect, LayoutError> {
    ctx.reject_unknown_attributes(node, &["width", "height"])?;
    let width = ctx.positive_number(node, "width")?;
    let height = ctx.positive_number(node, "height")?;
    Ok(Rect::new(0.0, width, 0.0, height))
}

/// Spawn defaults to the horizontal center, resting against the arena top.
fn parse_buddy(
    ctx: &DocContext<'_, '_>,
    node: Node<'_, '_>,
    arena: Rect,
) -> Result<BuddyDef, LayoutError> {
    ctx.reject_unknown_attributes(node, &["width", "height", "x", "y"])?;
    let half_extents = Vec2::new(
        ctx.positive_number(node, "width")? * 0.5,
        ctx.positive_number(node, "height")? * 0.5,
    );
    let x = ctx
        .optional_number(node, "x")?
        .unwrap_or_else(|| arena.center().x);
    let y = ctx
        .optional_number(node, "y")?
        .unwrap_or(arena.top - half_extents.y);
    Ok(BuddyDef {
        half_extents,
        spawn: Vec2::new(x, y),
    })
}

fn parse_panel(
    ctx: &DocContext<'_, '_>,
    node: Node<'_, '_>,
    seen_names: &mut HashSet<String>,
) -> Result<PanelDef, LayoutError> {
    ctx.reject_unknown_attributes(node, &["name", "x", "y", "width", "height", "collidable"])?;
    let name = ctx.required_name(node)?;
    if !seen_names.insert(name.clone()) {
        return Err(ctx.error_at(
            LayoutErrorCode::DuplicateName,
            format!("duplicate panel name '{name}'"),
            node,
        ));
    }
    let x = ctx.required_number(node, "x")?;
    let y = ctx.required_number(node, "y")?;
    let width = ctx.positive_number(node, "width")?;
    let height = ctx.positive_number(node, "height")?;
    let collidable = ctx.optional_bool(node, "collidable", false)?;
    Ok(PanelDef {
        name,
        bounds: Rect::from_origin_size(x, y, width, height),
        collidable,
    })
}

fn parse_page(
    ctx: &DocContext<'_, '_>,
    node: Node<'_, '_>,
    panel_names: &mut HashSet<String>,
) -> Result<PageDef, LayoutError> {
    ctx.reject_unknown_attributes(node, &["name", "wander"])?;
    let name = ctx.required_name(node)?;
    let allows_wander = ctx.optional_bool(node, "wander", true)?;
    let mut panels = Vec::<PanelDef>::new();
    for child in node.children().filter(|child| child.is_element()) {
        if child.tag_name().name() != "Panel" {
            return Err(ctx.error_at(
                LayoutErrorCode::UnknownElement,
                format!(
                    "unknown element <{}> in <Page>; only <Panel> is allowed",
                    child.tag_name().name()
                ),
                child,
            ));
        }
        panels.push(parse_panel(ctx, child, panel_names)?);
    }
    Ok(PageDef {
        name,
        allows_wander,
        panels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(raw: &str) -> Result<LayoutDef, LayoutError> {
        parse_layout(Path::new("layout.xml"), raw)
    }

    const MINIMAL: &str = r#"<Layout>
        <Arena width="800" height="450"/>
        <Buddy width="40" height="30" x="100" y="200"/>
        <Panel name="taskbar" x="0" y="0" width="800" height="20" collidable="true"/>
        <Page name="home">
            <Panel name="shelf" x="10" y="100" width="200" height="16" collidable="true"/>
            <Panel name="banner" x="300" y="380" width="200" height="40"/>
        </Page>
        <Page name="chat" wander="false"/>
    </Layout>"#;

    #[test]
    fn parses_arena_buddy_and_pages() {
        let layout = parse(MINIMAL).expect("layout");
        assert_eq!(layout.arena, Rect::new(0.0, 800.0, 0.0, 450.0));
        assert_eq!(layout.buddy.half_extents, Vec2::new(20.0, 15.0));
        assert_eq!(layout.buddy.spawn, Vec2::new(100.0, 200.0));
        assert_eq!(layout.global_panels.len(), 1);
        assert!(layout.global_panels[0].collidable);

        let home = layout.page("home").expect("home");
        assert!(home.allows_wander);
        assert_eq!(home.panels[0].bounds, Rect::new(10.0, 210.0, 100.0, 116.0));
        assert!(!home.panels[1].collidable);
        assert!(!layout.page("chat").expect("chat").allows_wander);
    }

    #[test]
    fn buddy_spawn_defaults_to_top_center() {
        let layout = parse(
            r#"<Layout><Arena width="100" height="50"/><Buddy width="10" height="10"/><Page name="p"/></Layout>"#,
        )
        .expect("layout");
        assert_eq!(layout.buddy.spawn, Vec2::new(50.0, 45.0));
    }

    #[test]
    fn missing_buddy_errors() {
        let err = parse(r#"<Layout><Arena width="100" height="50"/><Page name="p"/></Layout>"#)
            .expect_err("err");
        assert_eq!(err.code, LayoutErrorCode::MissingElement);
    }

    #[test]
    fn layout_without_pages_errors() {
        let err = parse(
            r#"<Layout><Arena width="100" height="50"/><Buddy width="10" height="10"/></Layout>"#,
        )
        .expect_err("err");
        assert_eq!(err.code, LayoutErrorCode::MissingElement);
    }

    #[test]
    fn non_positive_size_is_invalid() {
        let err = parse(
            r#"<Layout><Arena width="0" height="50"/><Buddy width="10" height="10"/><Page name="p"/></Layout>"#,
        )
        .expect_err("err");
        assert_eq!(err.code, LayoutErrorCode::InvalidValue);
    }

    #[test]
    fn bad_collidable_value_reports_location() {
        let err = parse(
            "<Layout>\n<Arena width=\"100\" height=\"50\"/>\n<Buddy width=\"10\" height=\"10\"/>\n<Page name=\"p\">\n<Panel name=\"a\" x=\"0\" y=\"0\" width=\"5\" height=\"5\" collidable=\"yes\"/>\n</Page>\n</Layout>",
        )
        .expect_err("err");
        assert_eq!(err.code, LayoutErrorCode::InvalidValue);
        assert_eq!(err.location.map(|loc| loc.line), Some(5));
    }

    #[test]
    fn duplicate_page_names_error() {
        let err = parse(
            r#"<Layout><Arena width="100" height="50"/><Buddy width="10" height="10"/><Page name="p"/><Page name="p"/></Layout>"#,
        )
        .expect_err("err");
        assert_eq!(err.code, LayoutErrorCode::DuplicateName);
    }

    #[test]
    fn panel_names_are_unique_across_pages() {
        let err = parse(
            r#"<Layout><Arena width="100" height="50"/><Buddy width="10" height="10"/>
                <Page name="a"><Panel name="x" x="0" y="0" width="1" height="1"/></Page>
                <Page name="b"><Panel name="x" x="0" y="0" width="1" height="1"/></Page>
            </Layout>"#,
        )
        .expect_err("err");
        assert_eq!(err.code, LayoutErrorCode::DuplicateName);
    }

    #[test]
    fn unknown_attribute_errors() {
        let err = parse(
            r#"<Layout><Arena width="100" height="50" depth="3"/><Buddy width="10" height="10"/><Page name="p"/></Layout>"#,
        )
        .expect_err("err");
        assert_eq!(err.code, LayoutErrorCode::UnknownAttribute);
    }

    #[test]
    fn wrong_root_errors() {
        let err = parse("<Screen/>").expect_err("err");
        assert_eq!(err.code, LayoutErrorCode::InvalidRoot);
    }

    #[test]
    fn malformed_xml_reports_location() {
        let err = parse("<Layout><Arena width=\"1\" height=\"1\"></Layout>").expect_err("err");
        assert_eq!(err.code, LayoutErrorCode::XmlMalformed);
        assert!(err.location.is_some());
    }

    #[test]
    fn load_layout_reads_file_and_reports_missing_file() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("layout.xml");
        std::fs::write(&path, MINIMAL).expect("write");
        assert_eq!(load_layout(&path).expect("layout").pages.len(), 2);

        let err = load_layout(&temp.path().join("missing.xml")).expect_err("err");
        assert_eq!(err.code, LayoutErrorCode::ReadFile);
    }
}
