use std::io::Write;

use owo_colors::OwoColorize;
use scopus_core::{Document, ScopusSearch};

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Print the search summary followed by one line per document.
pub fn print_summary(
    w: &mut dyn Write,
    search: &ScopusSearch,
    color: ColorMode,
) -> std::io::Result<()> {
    let source = if search.from_cache() { "cache" } else { "API" };
    if color.enabled() {
        writeln!(
            w,
            "{} {} ({} documents, from {})",
            "Search".bold(),
            search.query().cyan(),
            search.len(),
            source
        )?;
    } else {
        writeln!(
            w,
            "Search {} ({} documents, from {})",
            search.query(),
            search.len(),
            source
        )?;
    }
    writeln!(w)?;

    for (i, outcome) in search.map_items().into_iter().enumerate() {
        match outcome {
            Ok(doc) => {
                let year = doc.cover_date.as_deref().and_then(|d| d.get(..4));
                let meta = match (year, doc.publication_name.as_deref()) {
                    (Some(y), Some(p)) => format!("{}, {}", p, y),
                    (Some(y), None) => y.to_string(),
                    (None, Some(p)) => p.to_string(),
                    (None, None) => String::new(),
                };
                if color.enabled() {
                    writeln!(w, "[{}] {} {}", i + 1, doc.eid.dimmed(), doc.title)?;
                    if !meta.is_empty() {
                        writeln!(w, "      {}", meta.dimmed())?;
                    }
                } else {
                    writeln!(w, "[{}] {} {}", i + 1, doc.eid, doc.title)?;
                    if !meta.is_empty() {
                        writeln!(w, "      {}", meta)?;
                    }
                }
                if let Some(ref names) = doc.authname {
                    writeln!(w, "      {}", names.replace(';', "; "))?;
                }
            }
            Err(e) => {
                let msg = format!("[{}] skipped: {}", i + 1, e);
                if color.enabled() {
                    writeln!(w, "{}", msg.yellow())?;
                } else {
                    writeln!(w, "{}", msg)?;
                }
            }
        }
    }
    Ok(())
}

const CSV_HEADER: &str = "eid,doi,pii,title,subtype,creator,authname,authid,afid,coverDate,coverDisplayDate,publicationName,issn,source_id,aggregationType,volume,issueIdentifier,pageRange,citedby_count,openaccess";

fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn csv_opt(s: &Option<String>) -> String {
    s.as_deref().map(csv_escape).unwrap_or_default()
}

/// Write documents as CSV, one row per document.
pub fn write_csv(w: &mut dyn Write, docs: &[Document]) -> std::io::Result<()> {
    writeln!(w, "{}", CSV_HEADER)?;
    for d in docs {
        let row = [
            csv_escape(&d.eid),
            csv_opt(&d.doi),
            csv_opt(&d.pii),
            csv_escape(&d.title),
            csv_opt(&d.subtype),
            csv_opt(&d.creator),
            csv_opt(&d.authname),
            csv_opt(&d.authid),
            csv_opt(&d.afid),
            csv_opt(&d.cover_date),
            csv_opt(&d.cover_display_date),
            csv_opt(&d.publication_name),
            csv_opt(&d.issn),
            csv_opt(&d.source_id),
            csv_opt(&d.aggregation_type),
            csv_opt(&d.volume),
            csv_opt(&d.issue_identifier),
            csv_opt(&d.page_range),
            d.citedby_count.map(|c| c.to_string()).unwrap_or_default(),
            String::from(if d.openaccess { "1" } else { "0" }),
        ];
        writeln!(w, "{}", row.join(","))?;
    }
    Ok(())
}
