use std::fmt::{self, Write};

use blockform::help::help_html;

use crate::render::{FieldWidget, FormNode, FormSection, FormTree};

/// Render a form tree as an HTML fragment.
pub fn to_html(tree: &FormTree) -> String {
    Html(tree).to_string()
}

struct Html<'a>(&'a FormTree);

impl fmt::Display for Html<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tree = self.0;
        write!(f, "<form class=\"block-form\" data-block=\"{}\"", escape(&tree.block))?;
        if let Some(template) = &tree.form_template {
            write!(f, " data-form-template=\"{}\"", escape(template))?;
        }
        f.write_str(">\n")?;
        if !tree.unplaced_errors.is_empty() {
            f.write_str("  <div class=\"unplaced-errors\">\n")?;
            for unplaced in &tree.unplaced_errors {
                for message in &unplaced.messages {
                    writeln!(
                        f,
                        "    <p class=\"error-message\" data-field=\"{}\">{}</p>",
                        escape(&unplaced.field),
                        escape(message)
                    )?;
                }
            }
            f.write_str("  </div>\n")?;
        }
        write_section(f, &tree.root, 1, true)?;
        f.write_str("</form>\n")
    }
}

fn write_section(out: &mut impl Write, section: &FormSection, depth: usize, root: bool) -> fmt::Result {
    let pad = "  ".repeat(depth);

    let mut classes = vec![if root { "form-root" } else { "form-section" }];
    if let Some(classname) = &section.classname {
        classes.extend(classname.split_whitespace());
    }
    if section.has_errors() {
        classes.push("has-errors");
    }
    write!(out, "{}<section class=\"{}\"", pad, escape(&classes.join(" ")))?;
    for (key, value) in section.attrs.iter() {
        write!(out, " {}=\"{}\"", escape(key), escape(value))?;
    }
    if section.collapsed && section.open {
        out.write_str(" data-expanded=\"true\"")?;
    }
    out.write_str(">\n")?;

    if let Some(title) = section.title() {
        write!(out, "{}  <h2>", pad)?;
        if let Some(icon) = &section.icon {
            write!(out, "<span class=\"icon icon-{}\"></span>", escape(icon))?;
        }
        out.write_str(&escape(title))?;
        if section.has_errors() {
            write!(out, " <span class=\"error-count\">{}</span>", section.error_count)?;
        }
        out.write_str("</h2>\n")?;
    }
    if let Some(help) = &section.help_text {
        writeln!(out, "{}  <div class=\"help\">{}</div>", pad, help_html(help))?;
    }

    for node in &section.children {
        write_node(out, node, depth + 1)?;
    }

    if !section.settings.is_empty() {
        let mut class = String::from("settings");
        if section.settings_open {
            class.push_str(" has-errors");
        }
        write!(out, "{}  <div class=\"{}\"", pad, class)?;
        if section.settings_open {
            write!(out, " data-error-count=\"{}\"", section.settings_error_count)?;
        }
        out.write_str(">\n")?;
        for node in &section.settings {
            write_node(out, node, depth + 2)?;
        }
        writeln!(out, "{}  </div>", pad)?;
    }

    writeln!(out, "{}</section>", pad)
}

fn write_node(out: &mut impl Write, node: &FormNode, depth: usize) -> fmt::Result {
    match node {
        FormNode::Section(section) => write_section(out, section, depth, false),
        FormNode::Field(widget) => write_widget(out, widget, depth),
    }
}

fn write_widget(out: &mut impl Write, widget: &FieldWidget, depth: usize) -> fmt::Result {
    let pad = "  ".repeat(depth);
    let mut class = format!("field field-{}", widget.kind.tag());
    if widget.required {
        class.push_str(" required");
    }
    if widget.error_count() > 0 {
        class.push_str(" has-errors");
    }
    writeln!(out, "{}<div class=\"{}\" id=\"{}\">", pad, class, escape(&widget.id))?;
    writeln!(
        out,
        "{}  <label for=\"{}\">{}</label>",
        pad,
        escape(&widget.id),
        escape(&widget.name)
    )?;

    match &widget.nested {
        Some(nested) => write_section(out, &nested.root, depth + 1, false)?,
        None => writeln!(
            out,
            "{}  <output name=\"{}\">{}</output>",
            pad,
            escape(&widget.id),
            escape(&widget.value.to_string())
        )?,
    }

    for error in &widget.errors {
        writeln!(out, "{}  <p class=\"error-message\">{}</p>", pad, escape(error))?;
    }
    if let Some(help) = &widget.help_text {
        writeln!(out, "{}  <div class=\"help\">{}</div>", pad, help_html(help))?;
    }
    writeln!(out, "{}</div>", pad)
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockform::block::BlockDefinition;
    use blockform::field::{Field, FieldKind};
    use blockform::layout::{Group, Layout, LayoutNode};
    use blockform::value::{FieldErrors, FieldValues};

    use crate::render::render_form;

    fn tree(errors: &FieldErrors) -> FormTree {
        let def = BlockDefinition::new("person")
            .with_fields([
                Field::new("name", FieldKind::Char),
                Field::new("email", FieldKind::Email).with_help_text("Work address"),
            ])
            .unwrap();
        let layout = Layout::Root(Group::with_children(["name"]).settings([LayoutNode::from(
            Group::with_children(["email"])
                .heading("Contact & Visibility")
                .classname("collapsed")
                .attr("data-section", "contact")
                .attr("aria-label", "Contact \"card\""),
        )]));
        render_form(&def, &layout, &FieldValues::new(), errors)
    }

    #[test]
    fn attrs_are_escaped_in_insertion_order() {
        let html = to_html(&tree(&FieldErrors::new()));
        assert!(html.contains(
            "<section class=\"form-section collapsed\" data-section=\"contact\" aria-label=\"Contact &quot;card&quot;\">"
        ));
        assert!(html.contains("<h2>Contact &amp; Visibility</h2>"));
        assert!(html.contains("<div class=\"settings\">"));
        assert!(html.contains("<div class=\"help\"><p>Work address</p></div>"));
    }

    #[test]
    fn errors_mark_sections_and_settings() {
        let html = to_html(&tree(&FieldErrors::new().with("email", "Enter a valid email address.")));
        assert!(html.contains("<section class=\"form-root has-errors\">"));
        assert!(html.contains("<div class=\"settings has-errors\" data-error-count=\"1\">"));
        assert!(html.contains("collapsed has-errors"));
        assert!(html.contains("data-expanded=\"true\""));
        assert!(html.contains("<span class=\"error-count\">1</span>"));
        assert!(html.contains("<p class=\"error-message\">Enter a valid email address.</p>"));
        assert!(!html.contains("unplaced-errors"));
    }

    #[test]
    fn errors_without_a_widget_are_listed_on_the_form() {
        let html = to_html(&tree(&FieldErrors::new().with("legacy_id", "Not <allowed>.")));
        assert!(html.contains(
            "<p class=\"error-message\" data-field=\"legacy_id\">Not &lt;allowed&gt;.</p>"
        ));
        assert!(html.contains("<section class=\"form-root has-errors\">"));
    }
}
