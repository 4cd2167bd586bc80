use serde_json::{Map, Value};

use crate::logic::error::ValidationErrors;
use crate::model::{NewGroup, NewPet, NewTrait, PetFields, PetPatch, Sex};

pub const PET_NAME_MAX_CHARS: usize = 50;
pub const SCIENTIFIC_NAME_MAX_CHARS: usize = 50;
pub const TRAIT_NAME_MAX_CHARS: usize = 20;

const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Validate a create payload. Every scalar except `sex` is required, as are
/// `group` and `traits` (which may be an empty list).
pub fn parse_new_pet(body: &Value) -> Result<NewPet, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let Some(object) = expect_object(body, NON_FIELD_ERRORS, &mut errors) else {
        return Err(errors);
    };

    let name = present(object, "name", "name", true, &mut errors)
        .and_then(|v| char_field(v, "name", PET_NAME_MAX_CHARS, &mut errors));
    let age = present(object, "age", "age", true, &mut errors)
        .and_then(|v| age_field(v, "age", &mut errors));
    let weight = present(object, "weight", "weight", true, &mut errors)
        .and_then(|v| weight_field(v, "weight", &mut errors));
    let sex = match present(object, "sex", "sex", false, &mut errors) {
        Some(v) => sex_field(v, "sex", &mut errors),
        None => Some(Sex::default()),
    };
    let group = present(object, "group", "group", true, &mut errors)
        .and_then(|v| group_field(v, &mut errors));
    let traits = present(object, "traits", "traits", true, &mut errors)
        .and_then(|v| traits_field(v, &mut errors));

    match (name, age, weight, sex, group, traits) {
        (Some(name), Some(age), Some(weight), Some(sex), Some(group), Some(traits))
            if errors.is_empty() =>
        {
            Ok(NewPet {
                fields: PetFields {
                    name,
                    age,
                    weight,
                    sex,
                },
                group,
                traits,
            })
        }
        _ => Err(errors),
    }
}

/// Validate a partial update. Only keys present in the body are checked and
/// carried into the patch.
pub fn parse_pet_patch(body: &Value) -> Result<PetPatch, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let Some(object) = expect_object(body, NON_FIELD_ERRORS, &mut errors) else {
        return Err(errors);
    };

    let patch = PetPatch {
        name: present(object, "name", "name", false, &mut errors)
            .and_then(|v| char_field(v, "name", PET_NAME_MAX_CHARS, &mut errors)),
        age: present(object, "age", "age", false, &mut errors)
            .and_then(|v| age_field(v, "age", &mut errors)),
        weight: present(object, "weight", "weight", false, &mut errors)
            .and_then(|v| weight_field(v, "weight", &mut errors)),
        sex: present(object, "sex", "sex", false, &mut errors)
            .and_then(|v| sex_field(v, "sex", &mut errors)),
        group: present(object, "group", "group", false, &mut errors)
            .and_then(|v| group_field(v, &mut errors)),
        traits: present(object, "traits", "traits", false, &mut errors)
            .and_then(|v| traits_field(v, &mut errors)),
    };

    errors.into_result(patch)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

fn expect_object<'a>(
    value: &'a Value,
    path: &str,
    errors: &mut ValidationErrors,
) -> Option<&'a Map<String, Value>> {
    match value {
        Value::Object(object) => Some(object),
        other => {
            errors.add(
                path,
                format!(
                    "Invalid data. Expected a dictionary, but got {}.",
                    kind_of(other)
                ),
            );
            None
        }
    }
}

/// Non-null value for `key`. Missing keys are only an error when `required`;
/// explicit nulls always are.
fn present<'a>(
    object: &'a Map<String, Value>,
    key: &str,
    path: &str,
    required: bool,
    errors: &mut ValidationErrors,
) -> Option<&'a Value> {
    match object.get(key) {
        None => {
            if required {
                errors.add(path, "This field is required.");
            }
            None
        }
        Some(Value::Null) => {
            errors.add(path, "This field may not be null.");
            None
        }
        Some(value) => Some(value),
    }
}

fn char_field(
    value: &Value,
    path: &str,
    max_chars: usize,
    errors: &mut ValidationErrors,
) -> Option<String> {
    let Value::String(text) = value else {
        errors.add(path, "Not a valid string.");
        return None;
    };
    if text.trim().is_empty() {
        errors.add(path, "This field may not be blank.");
        return None;
    }
    if text.chars().count() > max_chars {
        errors.add(
            path,
            format!("Ensure this field has no more than {} characters.", max_chars),
        );
        return None;
    }
    Some(text.clone())
}

fn age_field(value: &Value, path: &str, errors: &mut ValidationErrors) -> Option<i32> {
    let parsed = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    let Some(age) = parsed else {
        errors.add(path, "A valid integer is required.");
        return None;
    };
    if age < 0 {
        errors.add(path, "Ensure this value is greater than or equal to 0.");
        return None;
    }
    match i32::try_from(age) {
        Ok(age) => Some(age),
        Err(_) => {
            errors.add(
                path,
                format!("Ensure this value is less than or equal to {}.", i32::MAX),
            );
            None
        }
    }
}

fn weight_field(value: &Value, path: &str, errors: &mut ValidationErrors) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    let Some(weight) = parsed.filter(|w| w.is_finite()) else {
        errors.add(path, "A valid number is required.");
        return None;
    };
    if weight < 0.0 {
        errors.add(path, "Ensure this value is greater than or equal to 0.");
        return None;
    }
    Some(weight)
}

fn sex_field(value: &Value, path: &str, errors: &mut ValidationErrors) -> Option<Sex> {
    let parsed = value.as_str().and_then(Sex::parse);
    if parsed.is_none() {
        let shown = value
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| value.to_string());
        errors.add(path, format!("\"{}\" is not a valid choice.", shown));
    }
    parsed
}

fn group_field(value: &Value, errors: &mut ValidationErrors) -> Option<NewGroup> {
    let object = expect_object(value, "group", errors)?;
    present(
        object,
        "scientific_name",
        "group.scientific_name",
        true,
        errors,
    )
    .and_then(|v| {
        char_field(
            v,
            "group.scientific_name",
            SCIENTIFIC_NAME_MAX_CHARS,
            errors,
        )
    })
    .map(NewGroup::new)
}

fn traits_field(value: &Value, errors: &mut ValidationErrors) -> Option<Vec<NewTrait>> {
    let Value::Array(items) = value else {
        errors.add(
            "traits",
            format!(
                "Expected a list of items but got type \"{}\".",
                kind_of(value)
            ),
        );
        return None;
    };

    let mut traits = Vec::with_capacity(items.len());
    let mut valid = true;
    for (index, item) in items.iter().enumerate() {
        let item_path = format!("traits.{}", index);
        let name_path = format!("{}.name", item_path);
        let parsed = expect_object(item, &item_path, errors)
            .and_then(|object| present(object, "name", &name_path, true, errors))
            .and_then(|v| char_field(v, &name_path, TRAIT_NAME_MAX_CHARS, errors));
        match parsed {
            Some(name) => traits.push(NewTrait::new(name)),
            None => valid = false,
        }
    }

    valid.then_some(traits)
}
