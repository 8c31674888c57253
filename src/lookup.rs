use crate::types::MergedEntity;
use std::collections::BTreeMap;

/// Case-insensitive substring match on LGU name, sorted by name.
pub fn search_by_name<'a>(entities: &'a BTreeMap<String, MergedEntity>, query: &str) -> Vec<&'a MergedEntity> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    let mut hits: Vec<&MergedEntity> = entities
        .values()
        .filter(|e| e.name.to_lowercase().contains(&needle))
        .collect();
    hits.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.entity_key.cmp(&b.entity_key)));
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(key: &str, name: &str) -> (String, MergedEntity) {
        let mut e = MergedEntity::new(key);
        e.name = name.to_string();
        (key.to_string(), e)
    }

    #[test]
    fn matches_substrings_ignoring_case() {
        let map = BTreeMap::from([
            entity("1", "City of San Fernando"),
            entity("2", "San Juan"),
            entity("3", "Quezon City"),
        ]);
        let hits: Vec<_> = search_by_name(&map, "san").iter().map(|e| e.entity_key.as_str()).collect();
        assert_eq!(hits, vec!["1", "2"]);
        assert_eq!(search_by_name(&map, "CITY").len(), 2);
    }

    #[test]
    fn blank_query_matches_nothing() {
        let map = BTreeMap::from([entity("1", "San Juan")]);
        assert!(search_by_name(&map, "  ").is_empty());
    }
}
