//! Cleanup of raw generator output and reconciliation with the parser.

use std::collections::HashSet;

use serde_json::Value;

use crate::models::Ingredient;

/// Keep ingredient objects with a non-blank name. Quantities may arrive as
/// numbers or numeric strings; anything else becomes `None`.
pub fn sanitize_ingredients(raw: &Value) -> Vec<Ingredient> {
    let Some(items) = raw.as_array() else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let name = item.get("name")?.as_str()?.trim();
            if name.is_empty() {
                return None;
            }
            let quantity = match item.get("quantity") {
                Some(Value::Number(n)) => n.as_f64(),
                Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            let unit = item
                .get("unit")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|u| !u.is_empty());
            Some(Ingredient::new(name, quantity, unit))
        })
        .collect()
}

/// Non-blank steps; non-string entries are stringified.
pub fn sanitize_steps(raw: &Value) -> Vec<String> {
    let Some(items) = raw.as_array() else {
        return Vec::new();
    };

    items
        .iter()
        .map(|step| match step {
            Value::String(s) => s.trim().to_string(),
            Value::Null => String::new(),
            other => other.to_string(),
        })
        .filter(|s| !s.is_empty())
        .collect()
}

/// Merge generator ingredients with parser output.
///
/// `reparsed[i]` is the parse of `generated[i]` rendered as a bullet line.
/// Generator order wins. The parser's quantity and unit are preferred when
/// present; its name only replaces the generated one on a case-insensitive
/// match. `extras` not already named are appended at the end.
pub fn merge_ingredients(
    generated: &[Ingredient],
    reparsed: &[Option<Ingredient>],
    extras: &[Ingredient],
) -> Vec<Ingredient> {
    let mut merged = Vec::with_capacity(generated.len() + extras.len());
    let mut seen = HashSet::new();

    for (index, item) in generated.iter().enumerate() {
        let key = name_key(item);
        if key.is_empty() {
            continue;
        }
        let from_parser = reparsed.get(index).and_then(Option::as_ref);

        let name = from_parser
            .filter(|p| name_key(p) == key)
            .and_then(|p| p.name.clone())
            .or_else(|| item.name.clone());
        let quantity = from_parser.and_then(|p| p.quantity).or(item.quantity);
        let unit = from_parser
            .and_then(|p| p.unit.clone())
            .filter(|u| !u.is_empty())
            .or_else(|| item.unit.clone());

        merged.push(Ingredient {
            name,
            quantity,
            unit,
        });
        seen.insert(key);
    }

    for item in extras {
        let key = name_key(item);
        if !key.is_empty() && seen.insert(key) {
            merged.push(item.clone());
        }
    }

    merged
}

fn name_key(item: &Ingredient) -> String {
    item.name_or_empty().trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sanitize_ingredients() {
        let raw = json!([
            {"name": " flour ", "quantity": "2", "unit": "cup"},
            {"name": "eggs", "quantity": 3},
            {"name": "   ", "quantity": 1},
            {"quantity": 1},
            {"name": "salt", "quantity": "a pinch", "unit": ""},
            "not an object"
        ]);

        let items = sanitize_ingredients(&raw);
        assert_eq!(
            items,
            vec![
                Ingredient::new("flour", Some(2.0), Some("cup")),
                Ingredient::new("eggs", Some(3.0), None),
                Ingredient::new("salt", None, None),
            ]
        );
        assert!(sanitize_ingredients(&json!({"name": "x"})).is_empty());
    }

    #[test]
    fn test_sanitize_steps() {
        let raw = json!(["  Boil water ", "", null, 42, "Serve"]);
        assert_eq!(sanitize_steps(&raw), vec!["Boil water", "42", "Serve"]);
    }

    #[test]
    fn test_merge_prefers_parser_values() {
        let generated = vec![
            Ingredient::new("Flour", Some(2.0), Some("cup")),
            Ingredient::new("eggs", None, None),
        ];
        let reparsed = vec![
            Some(Ingredient::new("flour", Some(250.0), Some("g"))),
            Some(Ingredient::new("eggs", Some(3.0), None)),
        ];

        let merged = merge_ingredients(&generated, &reparsed, &[]);
        assert_eq!(
            merged,
            vec![
                Ingredient::new("flour", Some(250.0), Some("g")),
                Ingredient::new("eggs", Some(3.0), None),
            ]
        );
    }

    #[test]
    fn test_merge_keeps_generated_name_when_parse_differs() {
        let generated = vec![
            Ingredient::new("onion", Some(1.0), Some("medium")),
            Ingredient::new("salt", None, Some("to taste")),
            Ingredient::new("garlic, minced", Some(2.0), Some("clove")),
        ];
        let reparsed = vec![
            Some(Ingredient::new("medium onion", Some(1.0), None)),
            Some(Ingredient::new("to taste salt", None, None)),
            Some(Ingredient::new("garlic", Some(2.0), Some("clove"))),
        ];

        let merged = merge_ingredients(&generated, &reparsed, &[]);
        assert_eq!(
            merged,
            vec![
                Ingredient::new("onion", Some(1.0), Some("medium")),
                Ingredient::new("salt", None, Some("to taste")),
                Ingredient::new("garlic, minced", Some(2.0), Some("clove")),
            ]
        );
    }

    #[test]
    fn test_merge_appends_extras_and_skips_blank_names() {
        let generated = vec![
            Ingredient::new("rice", Some(1.0), Some("cup")),
            Ingredient::default(),
        ];
        let reparsed = vec![Some(Ingredient::new("rice", None, None)), None];
        let extras = vec![
            Ingredient::new("garlic", Some(2.0), Some("clove")),
            Ingredient::new("Rice", None, None),
            Ingredient::new("garlic", None, None),
        ];

        let merged = merge_ingredients(&generated, &reparsed, &extras);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0], Ingredient::new("rice", Some(1.0), Some("cup")));
        assert_eq!(merged[1], Ingredient::new("garlic", Some(2.0), Some("clove")));
    }
}
