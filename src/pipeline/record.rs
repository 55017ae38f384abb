//! Record building: pick the infobox template and map its fields.

use crate::output::DistributionRecord;
use crate::pipeline::fields::{extract_fields, FieldMap};
use crate::pipeline::tree::Element;

/// Title of the infobox template carrying distribution facts.
pub const DEFAULT_TEMPLATE_TITLE: &str = "Probability distribution";

/// Build a record from the first top-level template titled `template_title`.
///
/// Returns `None` when no such template exists. Later templates with the
/// same title are never looked at. `name` and `depth` are left for the
/// caller.
pub fn build_record(tree: &Element, template_title: &str) -> Option<DistributionRecord> {
    let template = tree.templates().find(|t| {
        t.first_child("title")
            .map(|title| title.text().trim() == template_title)
            .unwrap_or(false)
    })?;

    Some(record_from_fields(&extract_fields(template)))
}

/// Map recognised field names onto the record schema.
///
/// Text fields ignore image values and `pdf_image` ignores text values;
/// unknown names are dropped.
pub fn record_from_fields(fields: &FieldMap) -> DistributionRecord {
    let text = |key: &str| {
        fields
            .get(key)
            .and_then(|v| v.as_text())
            .map(str::to_string)
            .unwrap_or_default()
    };

    DistributionRecord {
        parameters: text("parameters"),
        support: text("support"),
        notation: text("notation"),
        mean: text("mean"),
        variance: text("variance"),
        pdf: text("pdf"),
        cdf: text("cdf"),
        image: fields
            .get("pdf_image")
            .and_then(|v| v.as_image())
            .cloned(),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::ImageReference;
    use crate::pipeline::fields::FieldValue;
    use crate::pipeline::tree::parse_tree;

    #[test]
    fn missing_template_gives_none() {
        let tree = parse_tree("<root><template><title>Infobox person</title></template></root>").unwrap();
        assert!(build_record(&tree, DEFAULT_TEMPLATE_TITLE).is_none());
    }

    #[test]
    fn first_matching_template_wins() {
        let tree = parse_tree(
            "<root>\
             <template><title>Other</title><part><name>mean</name>=<value>0</value></part></template>\
             <template><title> Probability distribution </title><part><name>mean</name>=<value>1</value></part></template>\
             <template><title>Probability distribution</title><part><name>mean</name>=<value>2</value></part></template>\
             </root>",
        )
        .unwrap();
        let record = build_record(&tree, DEFAULT_TEMPLATE_TITLE).unwrap();
        assert_eq!(record.mean, "1");
    }

    #[test]
    fn nested_templates_are_not_top_level() {
        let tree = parse_tree(
            "<root><template><title>Wrapper</title><part><name>1</name>=<value>\
             <template><title>Probability distribution</title></template></value></part></template></root>",
        )
        .unwrap();
        assert!(build_record(&tree, DEFAULT_TEMPLATE_TITLE).is_none());
    }

    #[test]
    fn mismatched_value_kinds_are_discarded() {
        let mut fields = FieldMap::new();
        fields.insert(
            "parameters".into(),
            FieldValue::Image(ImageReference::new("p.png", "")),
        );
        fields.insert("pdf_image".into(), FieldValue::Text("not an image".into()));
        fields.insert("kurtosis".into(), FieldValue::Text("3".into()));
        let record = record_from_fields(&fields);
        assert_eq!(record.parameters, "");
        assert!(record.image.is_none());
        assert_eq!(record, DistributionRecord::default());
    }

    #[test]
    fn all_fields_are_mapped() {
        let mut fields = FieldMap::new();
        for key in ["parameters", "support", "notation", "mean", "variance", "pdf", "cdf"] {
            fields.insert(key.into(), FieldValue::Text(format!("<{key}>")));
        }
        fields.insert(
            "pdf_image".into(),
            FieldValue::Image(ImageReference::new("n.png", "pdf")),
        );
        let r = record_from_fields(&fields);
        assert_eq!(r.parameters, "<parameters>");
        assert_eq!(r.support, "<support>");
        assert_eq!(r.notation, "<notation>");
        assert_eq!(r.mean, "<mean>");
        assert_eq!(r.variance, "<variance>");
        assert_eq!(r.pdf, "<pdf>");
        assert_eq!(r.cdf, "<cdf>");
        assert_eq!(r.image, Some(ImageReference::new("n.png", "pdf")));
        assert_eq!(r.name, "");
        assert_eq!(r.depth, 0);
    }
}
