//! # In-Memory Gateway
//!
//! A [`RestGateway`] that keeps tables in process and answers the subset of
//! the REST dialect the repositories speak. Used by unit tests here and by
//! the workflow tests of the services crate (feature `testing`).
//!
//! ## Supported
//! ```text
//! filters     eq. neq. lt. is.null ilike.%p% in.(a,b)
//! modifiers   select= order=col.dir[,col.dir] limit=
//! writes      POST (with on_conflict + merge/ignore duplicates), PATCH, DELETE
//! headers     Prefer: return=representation
//! functions   rpc/add_to_cart
//! constraints unique column sets, violations answer 409 / 23505
//! faults      per table and method, optionally per row, optionally N times
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::{DataError, DataResult};
use crate::gateway::{Method, Prefer, RestGateway, RestRequest};
use crate::query::Query;
use crate::repository::{ADD_TO_CART_RPC, CART, ORDERS, PRODUCTS, STOCK_ADJUSTMENTS, USERS, WISHLIST};

type Row = Map<String, Value>;

const MODIFIERS: [&str; 5] = ["select", "order", "limit", "offset", "on_conflict"];

#[derive(Debug, Clone)]
struct Fault {
    table: String,
    method: Method,
    matching: Option<(String, String)>,
    status: u16,
    remaining: Option<usize>,
}

#[derive(Debug, Default)]
struct State {
    tables: HashMap<String, Vec<Row>>,
    unique: HashMap<String, Vec<Vec<String>>>,
    faults: Vec<Fault>,
    requests: Vec<RestRequest>,
    sequence: i64,
}

/// In-process stand-in for the hosted REST backend.
#[derive(Debug)]
pub struct MemoryGateway {
    state: Mutex<State>,
    epoch: DateTime<Utc>,
}

impl Default for MemoryGateway {
    fn default() -> Self {
        MemoryGateway::new()
    }
}

impl MemoryGateway {
    /// Creates an empty backend with the storefront's unique constraints.
    pub fn new() -> Self {
        let mut state = State::default();
        for (table, columns) in [
            (PRODUCTS, vec!["id"]),
            (CART, vec!["uid", "product_id"]),
            (WISHLIST, vec!["uid", "product_id"]),
            (ORDERS, vec!["order_number"]),
            (USERS, vec!["uid"]),
            (STOCK_ADJUSTMENTS, vec!["id"]),
        ] {
            state
                .unique
                .entry(table.to_string())
                .or_default()
                .push(columns.into_iter().map(String::from).collect());
        }

        MemoryGateway {
            state: Mutex::new(state),
            epoch: Utc::now(),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // =========================================================================
    // Test Setup
    // =========================================================================

    /// Inserts rows as-is, bypassing constraints.
    pub fn seed(&self, table: &str, rows: Vec<Value>) {
        let mut state = self.state();
        let rows: Vec<Row> = rows
            .into_iter()
            .filter_map(|v| match v {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        state.tables.entry(table.to_string()).or_default().extend(rows);
    }

    /// Declares an extra unique column set on a table.
    pub fn unique(&self, table: &str, columns: &[&str]) {
        self.state()
            .unique
            .entry(table.to_string())
            .or_default()
            .push(columns.iter().map(|c| c.to_string()).collect());
    }

    /// Every request to `table` with `method` answers `status`.
    pub fn fail(&self, table: &str, method: Method, status: u16) {
        self.push_fault(table, method, None, status, None);
    }

    /// The next `times` requests to `table` with `method` answer `status`.
    pub fn fail_times(&self, table: &str, method: Method, status: u16, times: usize) {
        self.push_fault(table, method, None, status, Some(times));
    }

    /// Requests whose filter has `field=eq.value` answer `status`.
    pub fn fail_matching(&self, table: &str, method: Method, field: &str, value: &str, status: u16) {
        self.push_fault(
            table,
            method,
            Some((field.to_string(), format!("eq.{}", value))),
            status,
            None,
        );
    }

    fn push_fault(
        &self,
        table: &str,
        method: Method,
        matching: Option<(String, String)>,
        status: u16,
        remaining: Option<usize>,
    ) {
        self.state().faults.push(Fault {
            table: table.to_string(),
            method,
            matching,
            status,
            remaining,
        });
    }

    /// Removes every injected fault.
    pub fn heal(&self) {
        self.state().faults.clear();
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Snapshot of a table's rows.
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.state()
            .tables
            .get(table)
            .map(|rows| rows.iter().cloned().map(Value::Object).collect())
            .unwrap_or_default()
    }

    /// The first row where `field` equals `value`.
    pub fn find(&self, table: &str, field: &str, value: &str) -> Option<Value> {
        self.rows(table)
            .into_iter()
            .find(|row| row.get(field).map(text).as_deref() == Some(value))
    }

    pub fn request_count(&self) -> usize {
        self.state().requests.len()
    }

    pub fn requests(&self) -> Vec<RestRequest> {
        self.state().requests.clone()
    }
}

// =============================================================================
// Gateway
// =============================================================================

#[async_trait]
impl RestGateway for MemoryGateway {
    async fn execute(&self, request: RestRequest) -> DataResult<Option<Value>> {
        // Let concurrent callers interleave the way real network calls do.
        tokio::task::yield_now().await;

        let mut state = self.state();
        state.requests.push(request.clone());

        if let Some(status) = state.take_fault(&request) {
            return Err(DataError::remote(
                status,
                json!({"message": "injected fault", "status": status}).to_string(),
            ));
        }

        if let Some(function) = request.path.strip_prefix("rpc/") {
            return state.call(function, &request, self.epoch);
        }

        let table = request.path.clone();
        let rows = match request.method {
            Method::Get => state.select(&table, &request.query),
            Method::Post => state.insert(&table, &request, self.epoch)?,
            Method::Patch => state.update(&table, &request),
            Method::Delete => state.delete(&table, &request.query),
        };

        if request.method == Method::Get || request.wants_representation() {
            Ok(Some(Value::Array(rows.into_iter().map(Value::Object).collect())))
        } else {
            Ok(None)
        }
    }
}

impl State {
    fn take_fault(&mut self, request: &RestRequest) -> Option<u16> {
        let index = self.faults.iter().position(|f| {
            f.table == request.path
                && f.method == request.method
                && f.remaining != Some(0)
                && match &f.matching {
                    Some((field, value)) => request.query.get(field) == Some(value.as_str()),
                    None => true,
                }
        })?;

        let fault = &mut self.faults[index];
        if let Some(remaining) = fault.remaining.as_mut() {
            *remaining -= 1;
        }
        Some(fault.status)
    }

    fn next_defaults(&mut self, row: &mut Row, epoch: DateTime<Utc>) {
        self.sequence += 1;
        row.entry("id").or_insert_with(|| json!(self.sequence));
        let stamp = epoch + Duration::milliseconds(self.sequence);
        row.entry("created_at")
            .or_insert_with(|| json!(stamp.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)));
    }

    fn select(&self, table: &str, query: &Query) -> Vec<Row> {
        let mut rows: Vec<Row> = self
            .tables
            .get(table)
            .map(|rows| rows.iter().filter(|r| matches(r, query)).cloned().collect())
            .unwrap_or_default();

        if let Some(order) = query.get("order") {
            let keys: Vec<(String, bool)> = order
                .split(',')
                .map(|part| match part.rsplit_once('.') {
                    Some((col, "desc")) => (col.to_string(), true),
                    Some((col, _)) => (col.to_string(), false),
                    None => (part.to_string(), false),
                })
                .collect();
            rows.sort_by(|a, b| {
                for (col, desc) in &keys {
                    let ord = compare(a.get(col), b.get(col));
                    let ord = if *desc { ord.reverse() } else { ord };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }

        if let Some(limit) = query.get("limit").and_then(|l| l.parse::<usize>().ok()) {
            rows.truncate(limit);
        }

        match query.get("select") {
            Some(columns) if columns != "*" => {
                let columns: Vec<&str> = columns.split(',').map(str::trim).collect();
                rows.into_iter()
                    .map(|row| {
                        row.into_iter()
                            .filter(|(k, _)| columns.contains(&k.as_str()))
                            .collect()
                    })
                    .collect()
            }
            _ => rows,
        }
    }

    fn conflict_index(&self, table: &str, columns: &[String], row: &Row) -> Option<usize> {
        self.tables.get(table)?.iter().position(|existing| {
            columns
                .iter()
                .all(|c| existing.get(c).map(text) == row.get(c).map(text) && row.get(c).is_some())
        })
    }

    fn insert(&mut self, table: &str, request: &RestRequest, epoch: DateTime<Utc>) -> DataResult<Vec<Row>> {
        let incoming: Vec<Row> = match request.body.clone() {
            Some(Value::Object(map)) => vec![map],
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|v| match v {
                    Value::Object(map) => Some(map),
                    _ => None,
                })
                .collect(),
            _ => return Err(DataError::remote(400, r#"{"message":"empty body"}"#)),
        };

        let on_conflict: Option<Vec<String>> = request
            .query
            .get("on_conflict")
            .map(|cols| cols.split(',').map(String::from).collect());
        let merge = request.prefer.contains(&Prefer::MergeDuplicates);
        let ignore = request.prefer.contains(&Prefer::IgnoreDuplicates);

        let mut written = Vec::new();
        for mut row in incoming {
            if let Some(columns) = &on_conflict {
                if let Some(index) = self.conflict_index(table, columns, &row) {
                    if ignore {
                        continue;
                    }
                    if merge {
                        if let Some(existing) = self.tables.get_mut(table).and_then(|t| t.get_mut(index)) {
                            existing.extend(row);
                            written.push(existing.clone());
                        }
                        continue;
                    }
                    return Err(unique_violation(table));
                }
            }

            let constraints = self.unique.get(table).cloned().unwrap_or_default();
            for columns in &constraints {
                if self.conflict_index(table, columns, &row).is_some() {
                    return Err(unique_violation(table));
                }
            }

            self.next_defaults(&mut row, epoch);
            self.tables.entry(table.to_string()).or_default().push(row.clone());
            written.push(row);
        }

        Ok(written)
    }

    fn update(&mut self, table: &str, request: &RestRequest) -> Vec<Row> {
        let patch = match &request.body {
            Some(Value::Object(map)) => map.clone(),
            _ => return Vec::new(),
        };

        let mut updated = Vec::new();
        if let Some(rows) = self.tables.get_mut(table) {
            for row in rows.iter_mut().filter(|r| matches(r, &request.query)) {
                row.extend(patch.clone());
                updated.push(row.clone());
            }
        }
        updated
    }

    fn delete(&mut self, table: &str, query: &Query) -> Vec<Row> {
        let Some(rows) = self.tables.get_mut(table) else {
            return Vec::new();
        };
        let (removed, kept): (Vec<Row>, Vec<Row>) = rows.drain(..).partition(|r| matches(r, query));
        *rows = kept;
        removed
    }

    fn call(&mut self, function: &str, request: &RestRequest, epoch: DateTime<Utc>) -> DataResult<Option<Value>> {
        if function != ADD_TO_CART_RPC {
            return Err(DataError::remote(
                404,
                json!({"code": "PGRST202", "message": format!("function {} not found", function)})
                    .to_string(),
            ));
        }

        let args = match &request.body {
            Some(Value::Object(map)) => map.clone(),
            _ => return Err(DataError::remote(400, r#"{"message":"missing arguments"}"#)),
        };
        let arg = |name: &str| args.get(name).cloned().unwrap_or(Value::Null);
        let quantity = arg("p_quantity").as_i64().unwrap_or(1);

        let mut row = Row::new();
        row.insert("uid".to_string(), arg("p_uid"));
        row.insert("product_id".to_string(), arg("p_product_id"));

        let key = vec!["uid".to_string(), "product_id".to_string()];
        if let Some(index) = self.conflict_index(CART, &key, &row) {
            if let Some(existing) = self.tables.get_mut(CART).and_then(|t| t.get_mut(index)) {
                let total = existing.get("quantity").and_then(Value::as_i64).unwrap_or(0) + quantity;
                existing.insert("quantity".to_string(), json!(total));
                existing.insert("updated_at".to_string(), json!(Utc::now()));
                return Ok(Some(json!([{ "quantity": total, "inserted": false }])));
            }
        }

        row.insert("name".to_string(), arg("p_name"));
        row.insert("price".to_string(), arg("p_price"));
        row.insert("image_url".to_string(), arg("p_image_url"));
        row.insert("quantity".to_string(), json!(quantity));
        self.next_defaults(&mut row, epoch);
        self.tables.entry(CART.to_string()).or_default().push(row);

        Ok(Some(json!([{ "quantity": quantity, "inserted": true }])))
    }
}

// =============================================================================
// Filter Evaluation
// =============================================================================

fn unique_violation(table: &str) -> DataError {
    DataError::remote(
        409,
        json!({
            "code": "23505",
            "message": format!("duplicate key value violates unique constraint on {}", table),
        })
        .to_string(),
    )
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Greater,
        (_, None | Some(Value::Null)) => Ordering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => {
            match (x.parse::<DateTime<Utc>>(), y.parse::<DateTime<Utc>>()) {
                (Ok(dx), Ok(dy)) => dx.cmp(&dy),
                _ => x.cmp(y),
            }
        }
        (Some(x), Some(y)) => text(x).cmp(&text(y)),
    }
}

fn matches(row: &Row, query: &Query) -> bool {
    query
        .pairs()
        .iter()
        .filter(|(key, _)| !MODIFIERS.contains(&key.as_str()))
        .all(|(field, filter)| matches_filter(row.get(field), filter))
}

fn matches_filter(value: Option<&Value>, filter: &str) -> bool {
    let is_null = matches!(value, None | Some(Value::Null));
    let actual = value.map(text).unwrap_or_default();

    if filter == "is.null" {
        return is_null;
    }
    if let Some(expected) = filter.strip_prefix("eq.") {
        return !is_null && actual == expected;
    }
    if let Some(expected) = filter.strip_prefix("neq.") {
        return is_null || actual != expected;
    }
    if let Some(bound) = filter.strip_prefix("lt.") {
        if is_null {
            return false;
        }
        return match (actual.parse::<f64>(), bound.parse::<f64>()) {
            (Ok(a), Ok(b)) => a < b,
            _ => actual.as_str() < bound,
        };
    }
    if let Some(bound) = filter.strip_prefix("gte.") {
        if is_null {
            return false;
        }
        return match (actual.parse::<f64>(), bound.parse::<f64>()) {
            (Ok(a), Ok(b)) => a >= b,
            _ => actual.as_str() >= bound,
        };
    }
    if let Some(pattern) = filter.strip_prefix("ilike.") {
        if is_null {
            return false;
        }
        return like(&actual.to_lowercase(), &pattern.to_lowercase());
    }
    if let Some(list) = filter.strip_prefix("in.(").and_then(|l| l.strip_suffix(')')) {
        return !is_null && list.split(',').any(|item| item == actual);
    }
    false
}

/// `%` matches any run of characters.
fn like(haystack: &str, pattern: &str) -> bool {
    let parts: Vec<&str> = pattern.split('%').collect();
    let mut rest = haystack;

    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == 0 {
            match rest.strip_prefix(part) {
                Some(r) => rest = r,
                None => return false,
            }
        } else {
            match rest.find(part) {
                Some(pos) => rest = &rest[pos + part.len()..],
                None => return false,
            }
        }
    }

    match parts.last() {
        Some(last) if !last.is_empty() && parts.len() > 1 => haystack.ends_with(last),
        Some(last) if parts.len() == 1 => haystack == *last,
        _ => true,
    }
}
