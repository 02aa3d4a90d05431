//! Rule-schema validation of action data and request parameters.

use regex::Regex;
use serde_json::Value;
use std::str::FromStr;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValidationRule {
    pub required: bool,
    pub present: bool,
    pub nullable: bool,
    pub kind: Option<Kind>,
    pub format: Option<Format>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub allowed: Option<Vec<String>>,
    pub pattern: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    String,
    Integer,
    Numeric,
    Boolean,
    Array,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Email,
    Uuid,
}

impl ValidationRule {
    pub fn required() -> Self {
        ValidationRule {
            required: true,
            ..Default::default()
        }
    }
}

impl FromStr for ValidationRule {
    type Err = String;

    /// Parse a pipe expression such as `required|string|max:250`.
    fn from_str(expr: &str) -> Result<Self, Self::Err> {
        let mut rule = ValidationRule::default();
        for part in expr.split('|').map(str::trim).filter(|p| !p.is_empty()) {
            let (name, arg) = match part.split_once(':') {
                Some((n, a)) => (n, Some(a)),
                None => (part, None),
            };
            let number = |a: Option<&str>| -> Result<f64, String> {
                a.and_then(|s| s.trim().parse::<f64>().ok())
                    .ok_or_else(|| format!("rule '{}' needs a numeric argument", name))
            };
            match name {
                "required" => rule.required = true,
                "present" => rule.present = true,
                "nullable" => rule.nullable = true,
                "string" => rule.kind = Some(Kind::String),
                "integer" => rule.kind = Some(Kind::Integer),
                "numeric" => rule.kind = Some(Kind::Numeric),
                "boolean" => rule.kind = Some(Kind::Boolean),
                "array" => rule.kind = Some(Kind::Array),
                "email" => rule.format = Some(Format::Email),
                "uuid" => rule.format = Some(Format::Uuid),
                "min" => rule.min = Some(number(arg)?),
                "max" => rule.max = Some(number(arg)?),
                "in" => {
                    rule.allowed = Some(arg.unwrap_or("").split(',').map(|s| s.trim().to_string()).collect());
                }
                "regex" => {
                    let pattern = arg.ok_or_else(|| "rule 'regex' needs a pattern".to_string())?;
                    Regex::new(pattern).map_err(|e| format!("invalid pattern: {}", e))?;
                    rule.pattern = Some(pattern.to_string());
                }
                other => return Err(format!("unknown rule '{}'", other)),
            }
        }
        Ok(rule)
    }
}

/// Ordered field-path -> rule schema. Empty schema always passes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValidationRules {
    rules: Vec<(String, ValidationRule)>,
}

impl ValidationRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(mut self, field: impl Into<String>, rule: ValidationRule) -> Self {
        self.rules.push((field.into(), rule));
        self
    }

    /// Build from `(field, "pipe|expression")` pairs.
    pub fn parse<I, K, V>(pairs: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut rules = ValidationRules::new();
        for (field, expr) in pairs {
            let field = field.into();
            let rule = expr.as_ref().parse().map_err(|e| format!("{}: {}", field, e))?;
            rules.rules.push((field, rule));
        }
        Ok(rules)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, ValidationRule)> {
        self.rules.iter()
    }
}

/// Ordered per-field messages, in rule order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValidationErrors {
    fields: Vec<(String, Vec<String>)>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn total(&self) -> usize {
        self.fields.iter().map(|(_, m)| m.len()).sum()
    }

    pub fn first(&self) -> Option<&str> {
        self.fields.first().and_then(|(_, m)| m.first()).map(String::as_str)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.fields.iter().find(|(f, _)| f == field).map(|(_, m)| m.as_slice())
    }

    /// `first` when there is one error, `"{first} and {n} errors more."` otherwise.
    pub fn summary(&self) -> Option<String> {
        let first = self.first()?;
        let rest = self.total() - 1;
        if rest == 0 {
            Some(first.to_string())
        } else {
            Some(format!("{} and {} errors more.", first, rest))
        }
    }

    pub fn into_fields(self) -> Vec<(String, Vec<String>)> {
        self.fields
    }

    fn push(&mut self, field: &str, message: String) {
        match self.fields.iter_mut().find(|(f, _)| f == field) {
            Some((_, messages)) => messages.push(message),
            None => self.fields.push((field.to_string(), vec![message])),
        }
    }
}

/// Dotted-path lookup: `None` when any segment is missing.
fn lookup<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(data, |cur, seg| match cur {
        Value::Object(map) => map.get(seg),
        Value::Array(items) => seg.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn display_name(field: &str) -> String {
    field.replace('_', " ")
}

fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        _ => false,
    }
}

fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn is_integer(v: &Value) -> bool {
    match v {
        Value::Number(n) => n.is_i64() || n.is_u64(),
        Value::String(s) => s.trim().parse::<i64>().is_ok(),
        _ => false,
    }
}

fn is_boolean(v: &Value) -> bool {
    match v {
        Value::Bool(_) => true,
        Value::Number(n) => matches!(n.as_i64(), Some(0 | 1)),
        Value::String(s) => matches!(s.as_str(), "0" | "1" | "true" | "false"),
        _ => false,
    }
}

/// Size used by min/max: numeric value for numeric kinds, length for strings and arrays.
fn size_of(v: &Value, kind: Option<Kind>) -> Option<f64> {
    match (kind, v) {
        (Some(Kind::Integer | Kind::Numeric), _) => as_number(v),
        (_, Value::String(s)) => Some(s.chars().count() as f64),
        (_, Value::Array(a)) => Some(a.len() as f64),
        (_, Value::Number(n)) => n.as_f64(),
        _ => None,
    }
}

fn unit(kind: Option<Kind>, v: &Value) -> &'static str {
    match (kind, v) {
        (Some(Kind::Integer | Kind::Numeric), _) | (_, Value::Number(_)) => "",
        (_, Value::Array(_)) => " items",
        _ => " characters",
    }
}

fn format_bound(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn check_field(field: &str, value: Option<&Value>, rule: &ValidationRule, errors: &mut ValidationErrors) {
    let label = display_name(field);
    if rule.present && value.is_none() {
        errors.push(field, format!("The {} field must be present.", label));
        return;
    }
    let blank = value.map(is_blank).unwrap_or(true);
    if rule.required && blank {
        errors.push(field, format!("The {} field is required.", label));
        return;
    }
    let Some(v) = value else { return };
    if v.is_null() || (blank && !rule.required && !matches!(v, Value::Array(_))) {
        return;
    }

    let type_ok = match rule.kind {
        Some(Kind::String) => v.is_string(),
        Some(Kind::Integer) => is_integer(v),
        Some(Kind::Numeric) => as_number(v).is_some(),
        Some(Kind::Boolean) => is_boolean(v),
        Some(Kind::Array) => v.is_array() || v.is_object(),
        None => true,
    };
    if !type_ok {
        let what = match rule.kind {
            Some(Kind::String) => "a string",
            Some(Kind::Integer) => "an integer",
            Some(Kind::Numeric) => "a number",
            Some(Kind::Boolean) => "true or false",
            _ => "an array",
        };
        errors.push(field, format!("The {} field must be {}.", label, what));
        return;
    }

    match rule.format {
        Some(Format::Email) => {
            let ok = v.as_str().map(|s| {
                let mut parts = s.splitn(2, '@');
                let local = parts.next().unwrap_or("");
                let domain = parts.next().unwrap_or("");
                !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
            });
            if ok != Some(true) {
                errors.push(field, format!("The {} field must be a valid email address.", label));
            }
        }
        Some(Format::Uuid) => {
            if v.as_str().map(|s| uuid::Uuid::parse_str(s).is_ok()) != Some(true) {
                errors.push(field, format!("The {} field must be a valid UUID.", label));
            }
        }
        None => {}
    }

    if let Some(size) = size_of(v, rule.kind) {
        if let Some(min) = rule.min {
            if size < min {
                errors.push(
                    field,
                    format!("The {} field must be at least {}{}.", label, format_bound(min), unit(rule.kind, v)),
                );
            }
        }
        if let Some(max) = rule.max {
            if size > max {
                errors.push(
                    field,
                    format!("The {} field must not be greater than {}{}.", label, format_bound(max), unit(rule.kind, v)),
                );
            }
        }
    }

    if let Some(allowed) = &rule.allowed {
        let text = match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        };
        if !text.map(|t| allowed.contains(&t)).unwrap_or(false) {
            errors.push(field, format!("The selected {} is invalid.", label));
        }
    }

    if let Some(pattern) = &rule.pattern {
        if let (Ok(re), Some(s)) = (Regex::new(pattern), v.as_str()) {
            if !re.is_match(s) {
                errors.push(field, format!("The {} field format is invalid.", label));
            }
        }
    }
}

/// Validate `data` against every rule; collects all failures.
pub fn validate(data: &Value, rules: &ValidationRules) -> ValidationErrors {
    let mut errors = ValidationErrors::default();
    for (field, rule) in rules.iter() {
        check_field(field, lookup(data, field), rule, &mut errors);
    }
    errors
}
