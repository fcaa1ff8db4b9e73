use crate::extract::{extract_array_of_objects, extract_value};
use serde::Serialize;

/// A project the authenticated user can see. Transient: rebuilt on every
/// query, identified solely by its non-empty `id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: String,
}

/// One hit from the object search endpoint (reports, cubes, dossiers...).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub id: String,
    pub name: String,
    pub object_type: String,
    pub subtype: String,
    pub date_modified: String,
    pub owner: String,
}

/// An entry in the user's library listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LibraryItem {
    pub id: String,
    pub name: String,
    pub object_type: String,
    pub project_id: String,
    pub date_modified: String,
}

/// Builds `Project` records from a projects listing body. Spans without an
/// `id` are silently dropped.
pub fn parse_projects(json: &str) -> Vec<Project> {
    let mut projects = Vec::new();

    for item in extract_array_of_objects(json) {
        let project = Project {
            id: extract_value(&item, "id"),
            name: extract_value(&item, "name"),
            description: extract_value(&item, "description"),
            status: extract_value(&item, "status"),
        };
        if !project.id.is_empty() {
            projects.push(project);
        }
    }

    projects
}

/// Builds `SearchResult` records from a search response body.
///
/// When the body carries a `"result"` section the scan starts there, so ids
/// from the envelope's metadata cannot shadow the hits; otherwise the whole
/// body is scanned. Spans without an `id` are silently dropped.
pub fn parse_search_results(json: &str) -> Vec<SearchResult> {
    let section = match json.find("\"result\"") {
        Some(pos) => &json[pos..],
        None => json,
    };

    let mut results = Vec::new();
    for item in extract_array_of_objects(section) {
        let result = SearchResult {
            id: extract_value(&item, "id"),
            name: extract_value(&item, "name"),
            object_type: extract_value(&item, "type"),
            subtype: extract_value(&item, "subtype"),
            date_modified: extract_value(&item, "dateModified"),
            owner: extract_value(&item, "owner"),
        };
        if !result.id.is_empty() {
            results.push(result);
        }
    }

    results
}

/// Builds `LibraryItem` records from a library listing body. Spans without
/// an `id` are silently dropped.
pub fn parse_library_items(json: &str) -> Vec<LibraryItem> {
    let mut items = Vec::new();

    for item in extract_array_of_objects(json) {
        let library_item = LibraryItem {
            id: extract_value(&item, "id"),
            name: extract_value(&item, "name"),
            object_type: extract_value(&item, "type"),
            project_id: extract_value(&item, "projectId"),
            date_modified: extract_value(&item, "dateModified"),
        };
        if !library_item.id.is_empty() {
            items.push(library_item);
        }
    }

    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_projects_and_drops_idless_spans() {
        let body = r#"[
            {"id":"P1","name":"Finance","description":"prod","status":"0"},
            {"name":"ghost entry","status":"0"},
            {"id":"P2","name":"Ops","description":"","status":"1"}
        ]"#;
        let projects = parse_projects(body);
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].id, "P1");
        assert_eq!(projects[0].name, "Finance");
        assert_eq!(projects[1].id, "P2");
    }

    #[test]
    fn search_scopes_to_the_result_section() {
        let body = r#"{"totalItems":2,"paging":[{"id":"not-a-hit"}],"result":[
            {"id":"R1","name":"Revenue Report","type":"3","subtype":"768","dateModified":"2025-01-01","owner":"admin"},
            {"id":"C1","name":"Finance Cube","type":"776","subtype":"776","dateModified":"2025-02-01","owner":"admin"}
        ]}"#;
        let results = parse_search_results(body);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "R1");
        assert_eq!(results[0].object_type, "3");
        assert_eq!(results[1].name, "Finance Cube");
    }

    #[test]
    fn search_falls_back_to_the_whole_body() {
        let body = r#"[{"id":"X","name":"n","type":"t","subtype":"s","dateModified":"d","owner":"o"}]"#;
        let results = parse_search_results(body);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "X");
    }

    #[test]
    fn parses_library_items() {
        let body = r#"[
            {"id":"L1","name":"Dashboard","type":"55","projectId":"P1","dateModified":"2025-03-01"},
            {"id":"","name":"dropped"}
        ]"#;
        let items = parse_library_items(body);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].project_id, "P1");
    }

    #[test]
    fn empty_body_parses_to_nothing() {
        assert!(parse_projects("").is_empty());
        assert!(parse_search_results("{}").is_empty());
        assert!(parse_library_items("no json here").is_empty());
    }
}
