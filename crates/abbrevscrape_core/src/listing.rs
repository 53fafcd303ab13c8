use std::collections::BTreeMap;

use crate::error::ScrapeError;

pub const DEFAULT_CONTAINER_ID: &str = "mw-pages";
pub const DEFAULT_NEXT_LABEL: &str = "next page";

/// How a listing page identifies its entries and its pagination link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingMarkers {
    /// `id` attribute of the element that wraps every entry.
    pub container_id: String,
    /// Visible text of the anchor pointing at the following page.
    pub next_label: String,
}

impl Default for ListingMarkers {
    fn default() -> Self {
        Self {
            container_id: DEFAULT_CONTAINER_ID.to_string(),
            next_label: DEFAULT_NEXT_LABEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    pub entries: Vec<String>,
    pub next_href: Option<String>,
}

#[derive(Debug, Clone)]
struct Anchor {
    attrs: BTreeMap<String, String>,
    text: String,
}

/// Extract the entry link texts and the optional next-page href from one page.
///
/// `url` is only used to label structural errors.
pub fn parse_listing_page(
    url: &str,
    html: &str,
    markers: &ListingMarkers,
) -> Result<ListingPage, ScrapeError> {
    let container = find_element_by_id(html, &markers.container_id).ok_or_else(|| {
        ScrapeError::page_structure(
            url,
            format!("no element with id=\"{}\"", markers.container_id),
        )
    })?;

    let mut entries = Vec::new();
    for (position, item) in scan_elements(container, "li").into_iter().enumerate() {
        let anchor = scan_anchors(item).into_iter().next().ok_or_else(|| {
            ScrapeError::page_structure(url, format!("list entry #{} has no link", position + 1))
        })?;
        entries.push(anchor.text);
    }

    let next_href = match scan_anchors(container)
        .into_iter()
        .find(|anchor| anchor.text.trim() == markers.next_label)
    {
        Some(anchor) => {
            let href = anchor
                .attrs
                .get("href")
                .map(|value| decode_html(value).trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or_else(|| {
                    ScrapeError::page_structure(
                        url,
                        format!("\"{}\" link has no href", markers.next_label),
                    )
                })?;
            Some(href)
        }
        None => None,
    };

    Ok(ListingPage { entries, next_href })
}

/// Inner HTML of the first element whose `id` matches, nested same-name tags included.
fn find_element_by_id<'a>(html: &'a str, id: &str) -> Option<&'a str> {
    let mut index = 0usize;
    while index < html.len() {
        let lt = html[index..].find('<')?;
        let at = index + lt;
        if let Some(after_comment) = skip_comment(html, at) {
            index = after_comment;
            continue;
        }
        let Some(name) = read_tag_name(html, at) else {
            index = at + 1;
            continue;
        };
        let end = find_tag_end(html, at)?;
        let attrs = parse_attributes(&html[at..=end], name);
        if attrs.get("id").map(String::as_str) == Some(id) {
            let inner_start = end + 1;
            let inner_end = find_matching_close(html, name, inner_start).unwrap_or(html.len());
            return Some(&html[inner_start..inner_end]);
        }
        index = end + 1;
    }
    None
}

/// Inner HTML of every `tag_name` element, in document order.
fn scan_elements<'a>(html: &'a str, tag_name: &str) -> Vec<&'a str> {
    let mut output = Vec::new();
    let mut index = 0usize;

    while index < html.len() {
        let Some(lt) = html[index..].find('<') else {
            break;
        };
        let at = index + lt;
        if let Some(after_comment) = skip_comment(html, at) {
            index = after_comment;
            continue;
        }
        if is_tag_at(html, at, tag_name) {
            let Some(end) = find_tag_end(html, at) else {
                break;
            };
            let inner_end = find_matching_close(html, tag_name, end + 1).unwrap_or(html.len());
            output.push(&html[end + 1..inner_end]);
            index = end + 1;
            continue;
        }
        index = at + 1;
    }

    output
}

fn scan_anchors(html: &str) -> Vec<Anchor> {
    let mut output = Vec::new();
    let mut index = 0usize;

    while index < html.len() {
        let Some(lt) = html[index..].find('<') else {
            break;
        };
        let at = index + lt;
        if let Some(after_comment) = skip_comment(html, at) {
            index = after_comment;
            continue;
        }
        if is_tag_at(html, at, "a") {
            let Some(end) = find_tag_end(html, at) else {
                break;
            };
            let attrs = parse_attributes(&html[at..=end], "a");
            let close = find_matching_close(html, "a", end + 1).unwrap_or(html.len());
            output.push(Anchor {
                attrs,
                text: decode_html(&strip_tags(&html[end + 1..close])),
            });
            index = close;
            continue;
        }
        index = at + 1;
    }

    output
}

/// Byte offset of the `</tag_name>` that balances an element opened just before `start`.
fn find_matching_close(html: &str, tag_name: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut index = start;
    while index < html.len() {
        let lt = html[index..].find('<')?;
        let at = index + lt;
        if let Some(after_comment) = skip_comment(html, at) {
            index = after_comment;
            continue;
        }
        if is_close_tag_at(html, at, tag_name) {
            if depth == 0 {
                return Some(at);
            }
            depth -= 1;
        } else if is_tag_at(html, at, tag_name) {
            let end = find_tag_end(html, at)?;
            if html.as_bytes()[end.saturating_sub(1)] != b'/' {
                depth += 1;
            }
            index = end + 1;
            continue;
        }
        index = at + 1;
    }
    None
}

fn skip_comment(html: &str, at: usize) -> Option<usize> {
    if !starts_with_at(html, at, "<!--") {
        return None;
    }
    Some(
        index_of_ignore_case(html, "-->", at + 4)
            .map(|end| end + 3)
            .unwrap_or(html.len()),
    )
}

fn read_tag_name(html: &str, at: usize) -> Option<&str> {
    let bytes = html.as_bytes();
    if bytes.get(at).copied() != Some(b'<') {
        return None;
    }
    let start = at + 1;
    let mut index = start;
    while index < bytes.len() && (bytes[index].is_ascii_alphanumeric() || bytes[index] == b'-') {
        index += 1;
    }
    if index == start || !bytes[start].is_ascii_alphabetic() {
        return None;
    }
    Some(&html[start..index])
}

fn is_tag_at(html: &str, at: usize, tag_name: &str) -> bool {
    let bytes = html.as_bytes();
    if bytes.get(at).copied() != Some(b'<') {
        return false;
    }
    name_ends_at(bytes, at + 1, tag_name)
}

fn is_close_tag_at(html: &str, at: usize, tag_name: &str) -> bool {
    let bytes = html.as_bytes();
    if bytes.get(at).copied() != Some(b'<') || bytes.get(at + 1).copied() != Some(b'/') {
        return false;
    }
    name_ends_at(bytes, at + 2, tag_name)
}

fn name_ends_at(bytes: &[u8], start: usize, tag_name: &str) -> bool {
    let mut index = start;
    for expected in tag_name.as_bytes() {
        let Some(actual) = bytes.get(index) else {
            return false;
        };
        if !actual.eq_ignore_ascii_case(expected) {
            return false;
        }
        index += 1;
    }
    matches!(
        bytes.get(index).copied(),
        Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b'\r') | Some(b'>') | Some(b'/')
    )
}

fn find_tag_end(html: &str, start: usize) -> Option<usize> {
    let bytes = html.as_bytes();
    let mut index = start;
    let mut quote = None::<u8>;
    while index < bytes.len() {
        let byte = bytes[index];
        if let Some(active) = quote {
            if byte == active {
                quote = None;
            }
            index += 1;
            continue;
        }
        if byte == b'"' || byte == b'\'' {
            quote = Some(byte);
            index += 1;
            continue;
        }
        if byte == b'>' {
            return Some(index);
        }
        index += 1;
    }
    None
}

fn parse_attributes(tag_raw: &str, tag_name: &str) -> BTreeMap<String, String> {
    let mut attrs = BTreeMap::new();
    let bytes = tag_raw.as_bytes();
    let mut index = tag_name.len() + 1;

    while index < bytes.len() {
        let byte = bytes[index];
        if byte == b'>' {
            break;
        }
        if byte == b'/' || byte.is_ascii_whitespace() {
            index += 1;
            continue;
        }

        let name_start = index;
        while index < bytes.len() {
            let ch = bytes[index];
            if ch.is_ascii_whitespace() || ch == b'=' || ch == b'>' || ch == b'/' {
                break;
            }
            index += 1;
        }
        if name_start == index {
            index += 1;
            continue;
        }
        let name = tag_raw[name_start..index].to_ascii_lowercase();
        while index < bytes.len() && bytes[index].is_ascii_whitespace() {
            index += 1;
        }
        let mut value = String::new();
        if bytes.get(index).copied() == Some(b'=') {
            index += 1;
            while index < bytes.len() && bytes[index].is_ascii_whitespace() {
                index += 1;
            }
            if let Some(quote) = bytes
                .get(index)
                .copied()
                .filter(|byte| *byte == b'"' || *byte == b'\'')
            {
                index += 1;
                let value_start = index;
                while index < bytes.len() && bytes[index] != quote {
                    index += 1;
                }
                value = tag_raw[value_start..index].to_string();
                if bytes.get(index).copied() == Some(quote) {
                    index += 1;
                }
            } else {
                let value_start = index;
                while index < bytes.len()
                    && !bytes[index].is_ascii_whitespace()
                    && bytes[index] != b'>'
                {
                    index += 1;
                }
                value = tag_raw[value_start..index].to_string();
            }
        }

        attrs.entry(name).or_insert(value);
    }

    attrs
}

fn strip_tags(html: &str) -> String {
    let mut output = String::with_capacity(html.len());
    let mut index = 0usize;
    while index < html.len() {
        let Some(lt) = html[index..].find('<') else {
            output.push_str(&html[index..]);
            break;
        };
        let at = index + lt;
        output.push_str(&html[index..at]);
        if let Some(after_comment) = skip_comment(html, at) {
            index = after_comment;
            continue;
        }
        match find_tag_end(html, at) {
            Some(end) => index = end + 1,
            None => break,
        }
    }
    output
}

fn index_of_ignore_case(text: &str, search: &str, start: usize) -> Option<usize> {
    let text_bytes = text.as_bytes();
    let search_bytes = search.as_bytes();
    if search_bytes.len() > text_bytes.len() || start >= text_bytes.len() {
        return None;
    }

    let last_start = text_bytes.len() - search_bytes.len();
    (start..=last_start).find(|index| {
        text_bytes[*index..*index + search_bytes.len()].eq_ignore_ascii_case(search_bytes)
    })
}

fn starts_with_at(text: &str, index: usize, sequence: &str) -> bool {
    text.as_bytes()
        .get(index..index + sequence.len())
        .is_some_and(|slice| slice == sequence.as_bytes())
}

// `&amp;` goes last so `&amp;lt;` decodes to `&lt;`, not `<`.
fn decode_html(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#039;", "'")
        .replace("&nbsp;", "\u{a0}")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
