//! Materials page reader.
//!
//! Policy fields are located by their labels; a page carrying none of them
//! is treated as a layout change rather than an empty policy.

use std::sync::LazyLock;

use regex::Regex;

use crate::{MaterialsInfo, ParseError};

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern compiles"));

static REORDER_POINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\breorder\s+point\s*(?:\([^)]*\))?\s*[:=]?\s*([^\s;]+)")
        .expect("reorder point pattern compiles")
});

static ORDER_QUANTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\border\s+quantity\s*(?:\([^)]*\))?\s*[:=]?\s*([^\s;]+)")
        .expect("order quantity pattern compiles")
});

static LEAD_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\blead\s+time\s*(?:\([^)]*\))?\s*[:=]?\s*([^\s;]+)")
        .expect("lead time pattern compiles")
});

static PENDING_ORDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\border\s+of\s+([^\s;]+)\s+(?:kits?\s+|units?\s+)?(?:is\s+)?(?:due|arriving|arrives|scheduled)\b[^;]*?\bday\s+([^\s;]+)",
    )
    .expect("pending order pattern compiles")
});

const PLACEHOLDERS: [&str; 5] = ["-", "--", "n/a", "na", "none"];

/// Reads the materials page.
///
/// The page must identify itself as a materials page and carry at least one
/// policy field label; otherwise the upstream layout changed and the payload
/// is rejected. Individual fields that are missing or show a placeholder
/// come back as `None`.
pub(crate) fn parse_materials(resource: &str, body: &str) -> Result<MaterialsInfo, ParseError> {
    let text = page_text(body);
    if !text.to_ascii_lowercase().contains("material") {
        return Err(ParseError::UnexpectedShape {
            resource: resource.to_owned(),
            detail: String::from("page does not mention materials"),
        });
    }

    let policy_fields = [&*REORDER_POINT, &*ORDER_QUANTITY, &*LEAD_TIME];
    if !policy_fields.iter().any(|pattern| pattern.is_match(&text)) {
        return Err(ParseError::UnexpectedShape {
            resource: resource.to_owned(),
            detail: String::from("no reorder point, order quantity or lead time label"),
        });
    }

    let mut info = MaterialsInfo {
        reorder_point: field(resource, "reorder point", &REORDER_POINT, &text)?,
        order_quantity: field(resource, "order quantity", &ORDER_QUANTITY, &text)?,
        lead_time: field(resource, "lead time", &LEAD_TIME, &text)?,
        ..MaterialsInfo::default()
    };

    if let Some(pending) = PENDING_ORDER.captures(&text) {
        info.next_arrival_quantity = number(resource, "next arrival quantity", &pending[1])?;
        if let Some(eta) = number(resource, "next arrival eta", &pending[2])? {
            info.next_arrival_eta = Some(super::plot::whole_day(
                resource,
                pending[2].trim_end_matches(['.', ',', ':']),
                eta,
            )?);
        }
    }

    Ok(info)
}

fn page_text(body: &str) -> String {
    let stripped = TAG.replace_all(body, " ");
    stripped
        .replace("&nbsp;", " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn field(
    resource: &str,
    name: &str,
    pattern: &Regex,
    text: &str,
) -> Result<Option<f64>, ParseError> {
    match pattern.captures(text) {
        Some(captures) => number(resource, name, &captures[1]),
        None => Ok(None),
    }
}

fn number(resource: &str, name: &str, token: &str) -> Result<Option<f64>, ParseError> {
    let token = token.trim_end_matches(['.', ',', ':']);
    if PLACEHOLDERS
        .iter()
        .any(|placeholder| token.eq_ignore_ascii_case(placeholder))
    {
        return Ok(None);
    }
    super::parse_number(token)
        .map(Some)
        .ok_or_else(|| ParseError::InvalidNumber {
            resource: resource.to_owned(),
            field: name.to_owned(),
            token: token.to_owned(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_PAGE: &str = r#"
        <html><body><h2>Raw Materials</h2>
        <p>Unit cost: $10.00</p>
        <p>Reorder point: 1,320 kits</p>
        <p>Order quantity: 7,200 kits</p>
        <p>Lead time: 4 days</p>
        <p>Order of 7,200 kits due to arrive on day 57.</p>
        </body></html>"#;

    #[test]
    fn every_field_is_read_from_a_full_page() {
        let info = parse_materials("materials/info", FULL_PAGE).expect("valid page");

        assert_eq!(info.reorder_point, Some(1320.0));
        assert_eq!(info.order_quantity, Some(7200.0));
        assert_eq!(info.lead_time, Some(4.0));
        assert_eq!(info.next_arrival_quantity, Some(7200.0));
        assert_eq!(info.next_arrival_eta, Some(57));
    }

    #[test]
    fn missing_pending_order_yields_none_not_zero() {
        let page = "<h2>Materials</h2><p>Reorder point: 1320</p><p>Order quantity: 7200</p>";
        let info = parse_materials("materials/info", page).expect("valid page");

        assert_eq!(info.next_arrival_eta, None);
        assert_eq!(info.next_arrival_quantity, None);
        assert_eq!(info.lead_time, None);
        assert_eq!(info.reorder_point, Some(1320.0));
    }

    #[test]
    fn placeholder_values_are_absent() {
        let page = "<h2>Materials</h2>Reorder point: N/A; Order quantity: -";
        let info = parse_materials("materials/info", page).expect("valid page");
        assert_eq!(info.reorder_point, None);
        assert_eq!(info.order_quantity, None);
    }

    #[test]
    fn non_numeric_field_is_a_parse_error() {
        let page = "<h2>Materials</h2>Reorder point: lots";
        let error = parse_materials("materials/info", page).expect_err("non-numeric");
        assert_eq!(
            error,
            ParseError::InvalidNumber {
                resource: String::from("materials/info"),
                field: String::from("reorder point"),
                token: String::from("lots"),
            }
        );
    }

    #[test]
    fn renamed_policy_fields_are_a_parse_error() {
        let page = "<h2>Materials</h2><p>Trigger level: 1320</p><p>Batch size: 7200</p>";
        let error = parse_materials("materials/info", page).expect_err("layout changed");
        assert!(matches!(error, ParseError::UnexpectedShape { .. }));
    }

    #[test]
    fn unrelated_page_is_rejected() {
        let error = parse_materials("materials/info", "<h1>Login</h1><input name=\"password\">")
            .expect_err("not a materials page");
        assert!(matches!(error, ParseError::UnexpectedShape { .. }));
    }
}
