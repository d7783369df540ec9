//! String inflection for model and relation names.
//!
//! Pluralization goes through the `inflector` crate, with a table of irregular
//! plurals that turn up in database schemas checked first. Compound names
//! (`user_role`, `UserRole`) only inflect their last word.

use inflector::Inflector;

/// Known irregular plurals that inflector doesn't handle well for database contexts.
static IRREGULAR_PLURALS: &[(&str, &str)] = &[
    // People
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    // Animals
    ("goose", "geese"),
    ("mouse", "mice"),
    ("ox", "oxen"),
    // -f/-fe → -ves
    ("leaf", "leaves"),
    ("life", "lives"),
    ("knife", "knives"),
    ("wife", "wives"),
    ("half", "halves"),
    ("shelf", "shelves"),
    // Latin/Greek
    ("analysis", "analyses"),
    ("basis", "bases"),
    ("crisis", "crises"),
    ("criterion", "criteria"),
    ("datum", "data"),
    ("medium", "media"),
    ("index", "indices"),
    ("matrix", "matrices"),
    ("vertex", "vertices"),
];

/// Pluralize a (possibly compound) name, keeping the case of its last word.
///
/// ```
/// use relmap::inference::naming::pluralize;
///
/// assert_eq!(pluralize("category"), "categories");
/// assert_eq!(pluralize("Person"), "People");
/// assert_eq!(pluralize("UserRole"), "UserRoles");
/// ```
pub fn pluralize(word: &str) -> String {
    inflect_last_word(word, pluralize_word)
}

/// Singularize a (possibly compound) name, keeping the case of its last word.
///
/// ```
/// use relmap::inference::naming::singularize;
///
/// assert_eq!(singularize("categories"), "category");
/// assert_eq!(singularize("role_users"), "role_user");
/// ```
pub fn singularize(word: &str) -> String {
    inflect_last_word(word, singularize_word)
}

fn pluralize_word(lower: &str) -> String {
    for (singular, plural) in IRREGULAR_PLURALS {
        if lower == *singular || lower == *plural {
            return plural.to_string();
        }
    }
    lower.to_plural()
}

fn singularize_word(lower: &str) -> String {
    for (singular, plural) in IRREGULAR_PLURALS {
        if lower == *plural || lower == *singular {
            return singular.to_string();
        }
    }
    lower.to_singular()
}

/// Apply `inflect` to the last word of `name`.
///
/// Words are split on `_` and on lower-to-upper case boundaries. The word is
/// inflected in lower case; a leading capital is restored afterwards.
fn inflect_last_word(name: &str, inflect: fn(&str) -> String) -> String {
    if name.is_empty() {
        return String::new();
    }

    let start = last_word_start(name);
    let (head, word) = name.split_at(start);
    if word.is_empty() {
        return name.to_string();
    }

    let inflected = inflect(&word.to_lowercase());
    let capitalized = word.chars().next().is_some_and(char::is_uppercase);
    if capitalized {
        format!("{head}{}", ucfirst(&inflected))
    } else {
        format!("{head}{inflected}")
    }
}

fn last_word_start(name: &str) -> usize {
    let mut start = 0;
    let mut previous: Option<char> = None;
    for (i, c) in name.char_indices() {
        match previous {
            Some('_') => start = i,
            Some(p) if c.is_uppercase() && p.is_lowercase() => start = i,
            _ => {}
        }
        previous = Some(c);
    }
    start
}

/// `user_roles`, from `UserRoles` or `userRoles`.
pub fn snake(name: &str) -> String {
    name.to_snake_case()
}

/// `userRoles`, from `user_roles` or `UserRoles`.
pub fn camel(name: &str) -> String {
    name.to_camel_case()
}

/// `UserRoles`, from `user_roles` or `userRoles`.
pub fn studly(name: &str) -> String {
    name.to_pascal_case()
}

/// Upper-case the first character only.
pub fn ucfirst(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Attribute-style name in the configured casing.
pub fn attribute(name: &str, snake_case: bool) -> String {
    if snake_case {
        snake(name)
    } else {
        camel(name)
    }
}

/// Remove the referenced key's name from the end of a foreign key column.
///
/// In snake mode the key must follow an underscore (`author_id` minus `id`
/// gives `author`); otherwise the key is matched as-is or in StudlyCase
/// (`authorId` minus `Id`). A column with no such suffix is returned whole, as
/// is one that would be stripped to nothing.
pub fn strip_key_suffix(snake_case: bool, key: &str, column: &str) -> String {
    if key.is_empty() {
        return column.to_string();
    }

    let candidates = if snake_case {
        [format!("_{key}"), format!("_{}", key.to_lowercase())]
    } else {
        [key.to_string(), studly(key)]
    };

    candidates
        .iter()
        .find_map(|suffix| column.strip_suffix(suffix.as_str()))
        .filter(|stripped| !stripped.is_empty())
        .unwrap_or(column)
        .to_string()
}
