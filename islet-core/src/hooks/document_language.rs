use crate::dom::Document;

/// Fallback when the root element has no usable `lang`.
const DEFAULT_LANGUAGE: &str = "en";

/// The `lang` attribute of the document's root element, or `"en"`.
pub fn use_document_language(document: &Document) -> String {
    match document.document_element().attribute("lang") {
        Some(lang) if !lang.is_empty() => lang,
        _ => DEFAULT_LANGUAGE.to_string(),
    }
}
