//! Builds parameterized SELECT, COUNT and DELETE statements from a resolved entity and a [`Query`].

use crate::config::ResolvedEntity;
use crate::query::{Condition, Query, Window};
use crate::storage::IncludeDirection;
use serde_json::Value;

const MAIN_ALIAS: &str = "main";

/// Describes one include for a single-query list: name, direction, related entity, our key column, their key column.
pub struct IncludeSelect<'a> {
    pub name: &'a str,
    pub direction: IncludeDirection,
    pub related: &'a ResolvedEntity,
    pub our_key: &'a str,
    pub their_key: &'a str,
}

/// Quote identifier for PostgreSQL (safe: only from config).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name.
fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(table))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> u32 {
        let n = self.params.len() as u32 + 1;
        self.params.push(v);
        n
    }
}

/// Placeholder for a value compared against `column`: cast to the column type when known.
fn placeholder(entity: &ResolvedEntity, column: &str, n: u32) -> String {
    entity
        .column(column)
        .and_then(|c| c.pg_type.as_deref())
        .map(|t| format!("${}::{}", n, t))
        .unwrap_or_else(|| format!("${}", n))
}

/// Column reference; untyped columns are compared as text since params are bound as text.
fn column_ref(entity: &ResolvedEntity, column: &str) -> String {
    let typed = entity.column(column).and_then(|c| c.pg_type.as_deref()).is_some();
    if typed {
        format!("{}.{}", MAIN_ALIAS, quoted(column))
    } else {
        format!("{}.{}::text", MAIN_ALIAS, quoted(column))
    }
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

/// Compile one condition. Columns not in config compile to `1 = 0` so identifiers never come from input.
fn condition_sql(entity: &ResolvedEntity, cond: &Condition, q: &mut QueryBuf) -> String {
    match cond {
        Condition::Eq { column, value } => {
            if entity.column(column).is_none() {
                return "1 = 0".into();
            }
            if value.is_null() {
                return format!("{}.{} IS NULL", MAIN_ALIAS, quoted(column));
            }
            let n = q.push_param(value.clone());
            format!("{} = {}", column_ref(entity, column), placeholder(entity, column, n))
        }
        Condition::In { column, values } => {
            if entity.column(column).is_none() || values.is_empty() {
                return "1 = 0".into();
            }
            let placeholders: Vec<String> = values
                .iter()
                .map(|v| {
                    let n = q.push_param(v.clone());
                    placeholder(entity, column, n)
                })
                .collect();
            format!("{} IN ({})", column_ref(entity, column), placeholders.join(", "))
        }
        Condition::Contains { column, needle, case_sensitive } => {
            if entity.column(column).is_none() {
                return "1 = 0".into();
            }
            let target = format!("{}.{}::text", MAIN_ALIAS, quoted(column));
            if *case_sensitive {
                let n = q.push_param(Value::String(needle.clone()));
                format!("strpos({}, ${}) > 0", target, n)
            } else {
                let n = q.push_param(Value::String(format!("%{}%", escape_like(needle))));
                format!("{} ILIKE ${}", target, n)
            }
        }
        Condition::Any(group) => {
            if group.is_empty() {
                return "1 = 0".into();
            }
            let parts: Vec<String> = group.iter().map(|c| condition_sql(entity, c, q)).collect();
            format!("({})", parts.join(" OR "))
        }
    }
}

fn where_clause(entity: &ResolvedEntity, query: &Query, q: &mut QueryBuf) -> String {
    let parts: Vec<String> = query.conditions.iter().map(|c| condition_sql(entity, c, q)).collect();
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

/// ORDER BY from the query; unknown sort columns are skipped. Falls back to the primary key.
fn order_clause(entity: &ResolvedEntity, query: &Query) -> String {
    let parts: Vec<String> = query
        .order
        .iter()
        .filter(|o| entity.column(&o.column).is_some())
        .map(|o| format!("{}.{} {}", MAIN_ALIAS, quoted(&o.column), o.direction.as_sql()))
        .collect();
    if parts.is_empty() {
        format!(" ORDER BY {}.{}", MAIN_ALIAS, quoted(&entity.pk_column))
    } else {
        format!(" ORDER BY {}", parts.join(", "))
    }
}

fn select_column_list(entity: &ResolvedEntity, alias: Option<&str>) -> String {
    entity
        .columns
        .iter()
        .map(|c| {
            let q = quoted(&c.name);
            let expr = match alias {
                Some(a) => format!("{}.{}", a, q),
                None => q.clone(),
            };
            let pg_type = c.pg_type.as_deref().unwrap_or("");
            if pg_type.contains('.') || pg_type == "numeric" {
                format!("{}::text AS {}", expr, q)
            } else if alias.is_some() {
                format!("{} AS {}", expr, q)
            } else {
                expr
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// SELECT with includes as scalar subqueries (json_agg for to_many, row_to_json for to_one).
pub fn select(entity: &ResolvedEntity, query: &Query, includes: &[IncludeSelect<'_>], window: Option<Window>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(&entity.schema_name, &entity.table_name);

    let mut select_parts = vec![select_column_list(entity, Some(MAIN_ALIAS))];
    for inc in includes {
        let rel_table = qualified_table(&inc.related.schema_name, &inc.related.table_name);
        let rel_cols = select_column_list(inc.related, None);
        let sub_from = format!(
            "{} WHERE {} = {}.{}",
            rel_table,
            quoted(inc.their_key),
            MAIN_ALIAS,
            quoted(inc.our_key)
        );
        let subquery = match inc.direction {
            IncludeDirection::ToOne => format!(
                "(SELECT row_to_json(sub) FROM (SELECT {} FROM {} LIMIT 1) sub)",
                rel_cols, sub_from
            ),
            IncludeDirection::ToMany => format!(
                "(SELECT COALESCE(json_agg(row_to_json(sub)), '[]'::json) FROM (SELECT {} FROM {}) sub)",
                rel_cols, sub_from
            ),
        };
        select_parts.push(format!("{} AS {}", subquery, quoted(inc.name)));
    }

    let where_sql = where_clause(entity, query, &mut q);
    let order_sql = order_clause(entity, query);
    let window_sql = window
        .map(|w| format!(" LIMIT {} OFFSET {}", w.limit, w.offset))
        .unwrap_or_default();

    q.sql = format!(
        "SELECT {} FROM {} {}{}{}{}",
        select_parts.join(", "),
        table,
        MAIN_ALIAS,
        where_sql,
        order_sql,
        window_sql
    );
    q
}

/// SELECT COUNT(*) over the same conditions as [`select`].
pub fn count(entity: &ResolvedEntity, query: &Query) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(&entity.schema_name, &entity.table_name);
    let where_sql = where_clause(entity, query, &mut q);
    q.sql = format!("SELECT COUNT(*) FROM {} {}{}", table, MAIN_ALIAS, where_sql);
    q
}

/// DELETE by one column. Caller checks the column is known; the value is the sole param.
pub fn delete_by(entity: &ResolvedEntity, column: &str, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(&entity.schema_name, &entity.table_name);
    let n = q.push_param(id.clone());
    let lhs = match entity.column(column).and_then(|c| c.pg_type.as_deref()) {
        Some(_) => quoted(column),
        None => format!("{}::text", quoted(column)),
    };
    q.sql = format!("DELETE FROM {} WHERE {} = {}", table, lhs, placeholder(entity, column, n));
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{parse_entities, resolve, ResolvedModel};
    use crate::query::SortDirection;
    use serde_json::json;

    fn model() -> ResolvedModel {
        let raw = r#"[
            {"name": "posts", "schema": "blog", "table": "posts",
             "columns": [{"name": "id", "type": "int8"}, {"name": "title", "type": "text"}, {"name": "status"}],
             "includes": [{"name": "comments", "entity": "comments", "direction": "to_many", "our_key": "id", "their_key": "post_id"}]},
            {"name": "comments", "schema": "blog", "table": "comments",
             "columns": [{"name": "id", "type": "int8"}, {"name": "post_id", "type": "int8"}]}
        ]"#;
        resolve(&parse_entities(raw).unwrap()).unwrap()
    }

    #[test]
    fn select_with_conditions_order_and_window() {
        let model = model();
        let posts = model.entity("posts").unwrap();
        let mut query = Query::new();
        query
            .where_eq("status", json!("published"))
            .where_in("id", vec![json!(1), json!(2)])
            .order_by("title", SortDirection::Desc);
        let q = select(posts, &query, &[], Some(Window { offset: 10, limit: 11 }));
        assert_eq!(
            q.sql,
            "SELECT main.\"id\" AS \"id\", main.\"title\" AS \"title\", main.\"status\" AS \"status\" \
             FROM \"blog\".\"posts\" main WHERE main.\"status\"::text = $1 AND main.\"id\" IN ($2::int8, $3::int8) \
             ORDER BY main.\"title\" DESC LIMIT 11 OFFSET 10"
        );
        assert_eq!(q.params, vec![json!("published"), json!(1), json!(2)]);
    }

    #[test]
    fn unknown_columns_never_reach_sql() {
        let model = model();
        let posts = model.entity("posts").unwrap();
        let mut query = Query::new();
        query.where_eq("title; DROP TABLE posts", json!(1)).order_by("nope", SortDirection::Asc);
        let q = select(posts, &query, &[], None);
        assert!(q.sql.contains("WHERE 1 = 0"));
        assert!(q.sql.ends_with("ORDER BY main.\"id\""));
        assert!(q.params.is_empty());
    }

    #[test]
    fn contains_and_any_groups() {
        let model = model();
        let posts = model.entity("posts").unwrap();
        let mut query = Query::new();
        query.where_any(vec![
            Condition::Contains { column: "title".into(), needle: "50%".into(), case_sensitive: false },
            Condition::Contains { column: "status".into(), needle: "pub".into(), case_sensitive: true },
        ]);
        let q = count(posts, &query);
        assert_eq!(
            q.sql,
            "SELECT COUNT(*) FROM \"blog\".\"posts\" main WHERE (main.\"title\"::text ILIKE $1 OR strpos(main.\"status\"::text, $2) > 0)"
        );
        assert_eq!(q.params, vec![json!("%50\\%%"), json!("pub")]);
    }

    #[test]
    fn includes_become_subqueries() {
        let model = model();
        let posts = model.entity("posts").unwrap();
        let comments = model.entity("comments").unwrap();
        let inc = IncludeSelect {
            name: "comments",
            direction: IncludeDirection::ToMany,
            related: comments,
            our_key: "id",
            their_key: "post_id",
        };
        let q = select(posts, &Query::new(), &[inc], None);
        assert!(q.sql.contains("json_agg(row_to_json(sub))"));
        assert!(q.sql.contains("WHERE \"post_id\" = main.\"id\""));
        assert!(q.sql.contains("AS \"comments\""));
    }

    #[test]
    fn null_equality_and_delete() {
        let model = model();
        let posts = model.entity("posts").unwrap();
        let mut query = Query::new();
        query.where_eq("title", Value::Null);
        assert!(count(posts, &query).sql.ends_with("WHERE main.\"title\" IS NULL"));

        let q = delete_by(posts, "id", &json!(7));
        assert_eq!(q.sql, "DELETE FROM \"blog\".\"posts\" WHERE \"id\" = $1::int8");
        assert_eq!(q.params, vec![json!(7)]);
    }
}
