use std::sync::LazyLock;

use lopdf::{Dictionary, Document, Object};
use regex::Regex;
use tracing::debug;

/// Professional-network profile path shape.
static PROFILE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"linkedin\.com/(in|pub|profile|company)/[\w-]+").expect("profile regex is valid")
});

/// Returns the first link whose lowercased target matches a profile path.
pub fn find_profile_link(links: &[String]) -> Option<String> {
    links
        .iter()
        .map(|uri| uri.to_lowercase())
        .find(|uri| PROFILE_LINK.is_match(uri))
}

/// Collects `/URI` action targets from every page's link annotations, in page order.
///
/// Annotation trees that do not have the expected shape are skipped; a
/// document without links simply yields an empty list.
pub fn extract_link_targets(doc: &Document) -> Vec<String> {
    let mut targets = Vec::new();

    for (page_num, page_id) in doc.get_pages() {
        let Ok(page) = doc.get_dictionary(page_id) else {
            continue;
        };
        let Ok(annots) = page.get(b"Annots") else {
            continue;
        };
        let Some(annots) = resolve(doc, annots).and_then(|o| o.as_array().ok()) else {
            continue;
        };

        for annot in annots {
            let Some(annot) = resolve(doc, annot).and_then(|o| o.as_dict().ok()) else {
                continue;
            };
            if let Some(uri) = uri_of(doc, annot) {
                debug!(page = page_num, uri = %uri, "Found link annotation");
                targets.push(uri);
            }
        }
    }

    targets
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(_) => doc.dereference(obj).ok().map(|(_, o)| o),
        other => Some(other),
    }
}

fn uri_of(doc: &Document, annot: &Dictionary) -> Option<String> {
    let action = annot.get(b"A").ok()?;
    let action = resolve(doc, action)?.as_dict().ok()?;
    match resolve(doc, action.get(b"URI").ok()?)? {
        Object::String(bytes, _) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}
