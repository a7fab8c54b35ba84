//! Mapping of raw search entries to [`Document`] records.
//!
//! Field definitions follow the Scopus Search COMPLETE view, except for
//! `authname`, `authid` and `afid`: these are the `;`-joined names, Scopus
//! author IDs and affiliation IDs of the deduplicated authors. An author
//! with several affiliations has them joined on `-`.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// A single document from a search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub eid: String,
    pub doi: Option<String>,
    pub pii: Option<String>,
    pub title: String,
    pub subtype: Option<String>,
    pub creator: Option<String>,
    pub authname: Option<String>,
    pub authid: Option<String>,
    pub afid: Option<String>,
    pub cover_date: Option<String>,
    pub cover_display_date: Option<String>,
    pub publication_name: Option<String>,
    pub issn: Option<String>,
    pub source_id: Option<String>,
    pub aggregation_type: Option<String>,
    pub volume: Option<String>,
    pub issue_identifier: Option<String>,
    pub page_range: Option<String>,
    pub citedby_count: Option<u64>,
    pub openaccess: bool,
}

/// A raw entry lacking a field every [`Document`] needs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("entry {position}{} has no usable '{field}'", eid_suffix(.eid))]
pub struct MalformedItem {
    /// Zero-based position of the entry in the result list.
    pub position: usize,
    pub eid: Option<String>,
    pub field: &'static str,
}

fn eid_suffix(eid: &Option<String>) -> String {
    eid.as_deref().map(|e| format!(" ({e})")).unwrap_or_default()
}

/// Derived author strings of one entry.
#[derive(Debug, Default, PartialEq, Eq)]
struct AuthorFields {
    authname: Option<String>,
    authid: Option<String>,
    afid: Option<String>,
}

/// Map every entry, keeping one outcome per entry in entry order.
pub fn map_items(items: &[Value]) -> Vec<Result<Document, MalformedItem>> {
    items
        .iter()
        .enumerate()
        .map(|(position, item)| to_document(position, item))
        .collect()
}

/// Map entries to documents, skipping malformed entries with a warning.
pub fn to_records(items: &[Value]) -> Vec<Document> {
    map_items(items)
        .into_iter()
        .filter_map(|r| match r {
            Ok(doc) => Some(doc),
            Err(e) => {
                tracing::warn!(
                    position = e.position,
                    eid = e.eid.as_deref().unwrap_or(""),
                    field = e.field,
                    "skipping malformed entry"
                );
                None
            }
        })
        .collect()
}

/// Map a single raw entry at `position`.
pub fn to_document(position: usize, item: &Value) -> Result<Document, MalformedItem> {
    let eid = text(item, "eid");
    let missing = |field: &'static str| MalformedItem {
        position,
        eid: eid.clone(),
        field,
    };

    let title = text(item, "dc:title").ok_or_else(|| missing("dc:title"))?;
    let openaccess = item
        .get("openaccess")
        .and_then(parse_flag)
        .ok_or_else(|| missing("openaccess"))?;
    let eid = eid.clone().ok_or_else(|| missing("eid"))?;

    let authors = derive_author_fields(item).unwrap_or_default();

    Ok(Document {
        eid,
        doi: text(item, "prism:doi"),
        pii: text(item, "pii"),
        title,
        subtype: text(item, "subtype"),
        creator: text(item, "dc:creator"),
        authname: authors.authname,
        authid: authors.authid,
        afid: authors.afid,
        cover_date: text(item, "prism:coverDate"),
        cover_display_date: text(item, "prism:coverDisplayDate"),
        publication_name: text(item, "prism:publicationName"),
        issn: text(item, "prism:issn"),
        source_id: text(item, "source-id"),
        aggregation_type: text(item, "prism:aggregationType"),
        volume: text(item, "prism:volume"),
        issue_identifier: text(item, "prism:issueIdentifier"),
        page_range: text(item, "prism:pageRange"),
        citedby_count: item.get("citedby-count").and_then(parse_count),
        openaccess,
    })
}

/// Build `authname`, `authid` and `afid` from the entry's author list.
///
/// Returns `None` when the list is missing or any author lacks a name, an
/// ID, or an affiliation's `$` value; the caller then leaves all three absent.
fn derive_author_fields(item: &Value) -> Option<AuthorFields> {
    let list = item.get("author")?.as_array()?;

    let mut authors: Vec<&Value> = Vec::with_capacity(list.len());
    for author in list {
        if !authors.contains(&author) {
            authors.push(author);
        }
    }

    let mut names = Vec::with_capacity(authors.len());
    let mut ids = Vec::with_capacity(authors.len());
    let mut affs = Vec::with_capacity(authors.len());
    for author in &authors {
        names.push(scalar(author.get("authname")?)?);
        ids.push(scalar(author.get("authid")?)?);

        let groups = match author.get("afid") {
            None => Vec::new(),
            Some(Value::Array(arr)) => arr.iter().collect(),
            Some(single) => vec![single],
        };
        let group_ids = groups
            .into_iter()
            .map(|a| a.get("$").and_then(scalar))
            .collect::<Option<Vec<String>>>()?;
        affs.push(group_ids.join("-"));
    }

    let afid = affs.join(";");
    Some(AuthorFields {
        authname: Some(names.join(";")),
        authid: Some(ids.join(";")),
        afid: (!afid.is_empty()).then_some(afid),
    })
}

/// A scalar field rendered as text; `null`, arrays and objects are absent.
fn text(item: &Value, key: &str) -> Option<String> {
    item.get(key).and_then(scalar)
}

fn scalar(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn parse_count(v: &Value) -> Option<u64> {
    match v {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_flag(v: &Value) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_u64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" => Some(true),
            "0" | "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(eid: &str, authors: Value) -> Value {
        json!({
            "eid": eid,
            "dc:title": format!("Title of {eid}"),
            "openaccess": "0",
            "author": authors,
        })
    }

    #[test]
    fn maps_all_projected_fields() {
        let item = json!({
            "eid": "2-s2.0-85000000001",
            "prism:doi": "10.1016/j.example.2020.01.001",
            "pii": "S0000000000000001",
            "dc:title": "Graphene transport",
            "subtype": "ar",
            "dc:creator": "Smith J.",
            "prism:coverDate": "2020-03-01",
            "prism:coverDisplayDate": "March 2020",
            "prism:publicationName": "Journal of Examples",
            "prism:issn": "00000000",
            "source-id": "12345",
            "prism:aggregationType": "Journal",
            "prism:volume": "12",
            "prism:issueIdentifier": "3",
            "prism:pageRange": "100-110",
            "citedby-count": "42",
            "openaccess": "1",
            "author": [{"authname": "Smith J.", "authid": "111", "afid": [{"$": "60000001"}]}]
        });
        let doc = to_document(0, &item).unwrap();
        assert_eq!(doc.eid, "2-s2.0-85000000001");
        assert_eq!(doc.doi.as_deref(), Some("10.1016/j.example.2020.01.001"));
        assert_eq!(doc.pii.as_deref(), Some("S0000000000000001"));
        assert_eq!(doc.title, "Graphene transport");
        assert_eq!(doc.subtype.as_deref(), Some("ar"));
        assert_eq!(doc.creator.as_deref(), Some("Smith J."));
        assert_eq!(doc.authname.as_deref(), Some("Smith J."));
        assert_eq!(doc.authid.as_deref(), Some("111"));
        assert_eq!(doc.afid.as_deref(), Some("60000001"));
        assert_eq!(doc.cover_date.as_deref(), Some("2020-03-01"));
        assert_eq!(doc.cover_display_date.as_deref(), Some("March 2020"));
        assert_eq!(doc.publication_name.as_deref(), Some("Journal of Examples"));
        assert_eq!(doc.issn.as_deref(), Some("00000000"));
        assert_eq!(doc.source_id.as_deref(), Some("12345"));
        assert_eq!(doc.aggregation_type.as_deref(), Some("Journal"));
        assert_eq!(doc.volume.as_deref(), Some("12"));
        assert_eq!(doc.issue_identifier.as_deref(), Some("3"));
        assert_eq!(doc.page_range.as_deref(), Some("100-110"));
        assert_eq!(doc.citedby_count, Some(42));
        assert!(doc.openaccess);
    }

    #[test]
    fn optional_fields_absent_when_missing_or_null() {
        let item = json!({"eid": "e", "dc:title": "t", "openaccess": 0, "prism:doi": null});
        let doc = to_document(0, &item).unwrap();
        assert!(doc.doi.is_none());
        assert!(doc.pii.is_none());
        assert!(doc.citedby_count.is_none());
        assert!(!doc.openaccess);
    }

    #[test]
    fn numeric_scalars_rendered_as_text() {
        let item = json!({
            "eid": "e", "dc:title": "t", "openaccess": true,
            "source-id": 21100, "citedby-count": 5
        });
        let doc = to_document(0, &item).unwrap();
        assert_eq!(doc.source_id.as_deref(), Some("21100"));
        assert_eq!(doc.citedby_count, Some(5));
        assert!(doc.openaccess);
    }

    #[test]
    fn duplicate_authors_counted_once() {
        let smith = json!({"authname": "Smith J.", "authid": "1", "afid": [{"$": "10"}]});
        let jones = json!({"authname": "Jones A.", "authid": "2", "afid": [{"$": "20"}]});
        let item = entry("e", json!([smith.clone(), jones, smith]));
        let doc = to_document(0, &item).unwrap();
        assert_eq!(doc.authname.as_deref(), Some("Smith J.;Jones A."));
        assert_eq!(doc.authid.as_deref(), Some("1;2"));
        assert_eq!(doc.afid.as_deref(), Some("10;20"));
    }

    #[test]
    fn authors_differing_in_any_field_are_kept() {
        let a = json!({"authname": "Smith J.", "authid": "1", "afid": [{"$": "10"}]});
        let b = json!({"authname": "Smith J.", "authid": "1", "afid": [{"$": "11"}]});
        let doc = to_document(0, &entry("e", json!([a, b]))).unwrap();
        assert_eq!(doc.authid.as_deref(), Some("1;1"));
        assert_eq!(doc.afid.as_deref(), Some("10;11"));
    }

    #[test]
    fn multiple_affiliations_joined_with_dash() {
        let item = entry(
            "e",
            json!([
                {"authname": "A", "authid": "1", "afid": [{"$": "10"}, {"$": "20"}]},
                {"authname": "B", "authid": "2", "afid": [{"$": "30"}, {"$": "40"}]}
            ]),
        );
        let doc = to_document(0, &item).unwrap();
        assert_eq!(doc.afid.as_deref(), Some("10-20;30-40"));
    }

    #[test]
    fn single_affiliation_object_treated_as_list() {
        let item = entry(
            "e",
            json!([{"authname": "A", "authid": "1", "afid": {"$": "10"}}]),
        );
        let doc = to_document(0, &item).unwrap();
        assert_eq!(doc.afid.as_deref(), Some("10"));
    }

    #[test]
    fn missing_affiliations_contribute_empty_groups() {
        let item = entry(
            "e",
            json!([{"authname": "A", "authid": "1"}, {"authname": "B", "authid": "2"}]),
        );
        let doc = to_document(0, &item).unwrap();
        assert_eq!(doc.authname.as_deref(), Some("A;B"));
        assert_eq!(doc.afid.as_deref(), Some(";"));

        let item = entry("e", json!([{"authname": "A", "authid": "1"}]));
        let doc = to_document(0, &item).unwrap();
        assert!(doc.afid.is_none());
    }

    #[test]
    fn malformed_author_blanks_only_derived_fields() {
        let item = json!({
            "eid": "e", "dc:title": "t", "openaccess": "1", "prism:doi": "10.1/x",
            "author": [{"authname": "A", "authid": "1"}, {"authid": "2"}]
        });
        let doc = to_document(0, &item).unwrap();
        assert!(doc.authname.is_none());
        assert!(doc.authid.is_none());
        assert!(doc.afid.is_none());
        assert_eq!(doc.doi.as_deref(), Some("10.1/x"));
    }

    #[test]
    fn affiliation_without_value_blanks_derived_fields() {
        let item = entry(
            "e",
            json!([{"authname": "A", "authid": "1", "afid": [{"@_fa": "true"}]}]),
        );
        let doc = to_document(0, &item).unwrap();
        assert!(doc.authname.is_none());
        assert!(doc.authid.is_none());
        assert!(doc.afid.is_none());
    }

    #[test]
    fn missing_author_list_isolated_to_its_item() {
        let good = |eid| {
            entry(
                eid,
                json!([{"authname": "A", "authid": "1", "afid": [{"$": "10"}]}]),
            )
        };
        let bare = json!({"eid": "b", "dc:title": "t", "openaccess": "0"});
        let items = vec![good("a"), bare, good("c")];
        let docs = to_records(&items);
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].authname.as_deref(), Some("A"));
        assert!(docs[1].authname.is_none());
        assert!(docs[1].authid.is_none());
        assert!(docs[1].afid.is_none());
        assert_eq!(docs[2].afid.as_deref(), Some("10"));
    }

    #[test]
    fn missing_title_is_malformed_item() {
        let item = json!({"eid": "2-s2.0-9", "openaccess": "0"});
        let err = to_document(4, &item).unwrap_err();
        assert_eq!(
            err,
            MalformedItem {
                position: 4,
                eid: Some("2-s2.0-9".into()),
                field: "dc:title",
            }
        );
        assert_eq!(err.to_string(), "entry 4 (2-s2.0-9) has no usable 'dc:title'");
    }

    #[test]
    fn missing_eid_and_bad_flag_are_malformed() {
        let no_eid = json!({"dc:title": "t", "openaccess": "1"});
        assert_eq!(to_document(0, &no_eid).unwrap_err().field, "eid");

        let bad_flag = json!({"eid": "e", "dc:title": "t", "openaccess": "maybe"});
        assert_eq!(to_document(0, &bad_flag).unwrap_err().field, "openaccess");
    }

    #[test]
    fn malformed_items_skipped_order_preserved() {
        let items = vec![
            entry("a", json!([])),
            json!({"eid": "b", "openaccess": "0"}),
            entry("c", json!([])),
        ];
        let outcomes = map_items(&items);
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[1].is_err());

        let docs = to_records(&items);
        let eids: Vec<_> = docs.iter().map(|d| d.eid.as_str()).collect();
        assert_eq!(eids, vec!["a", "c"]);
    }

    #[test]
    fn record_count_and_order_match_items() {
        let items: Vec<Value> = (0..30).map(|i| entry(&format!("e{i}"), json!([]))).collect();
        let docs = to_records(&items);
        assert_eq!(docs.len(), items.len());
        for (i, doc) in docs.iter().enumerate() {
            assert_eq!(doc.eid, format!("e{i}"));
        }
    }
}
