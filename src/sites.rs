//! Facts collected from one analyzed unit.
//!
//! A unit is a type (all of its methods share its fields) or a free-standing
//! function. Collection walks each method once and records:
//!
//! - [`QuerySite`]s for every `prepare`/`query` call, with resolved text
//! - [`BindingEvent`]s for `bindValue`/`bindParam`
//! - [`ExecuteSite`]s for `execute`, with the parameter array if it is known
//! - [`FetchSite`]s for fetches that are assigned, returned or loop-driving,
//!   including fetches chained directly onto a preparation call
//!
//! Everything here is built fresh per unit and dropped afterwards.

mod guard;

use compact_str::CompactString;
pub use guard::FetchGuard;
use indexmap::IndexSet;
use tracing::trace;

use crate::{
    host::{
        ArrayItem, Call, CallKind, Expr, Location, Method, Role, Stmt, StmtCx, Target, TypeAlias,
        visit_calls, walk_expr
    },
    resolve::{LocalAssignments, resolve_query_text},
    scan
};

/// Index of a method within its unit.
pub type MethodId = usize;

/// A preparation call.
#[derive(Debug, Clone)]
pub struct QuerySite {
    /// Field or local the statement handle is stored in; `None` when the
    /// result is used directly
    pub target:       Option<Target>,
    pub method:       MethodId,
    /// [`CallKind::Prepare`] or [`CallKind::Query`]
    pub kind:         CallKind,
    pub text:         Option<String>,
    /// Text was assembled from literal segments only
    pub opaque:       bool,
    pub placeholders: IndexSet<CompactString>,
    pub location:     Location
}

/// `bindValue(':name', ...)` / `bindParam(':name', ...)`.
#[derive(Debug, Clone)]
pub struct BindingEvent {
    pub target:   Target,
    pub method:   MethodId,
    /// Parameter name without the leading colon
    pub param:    CompactString,
    pub kind:     CallKind,
    pub location: Location
}

/// A key of the parameter array passed to `execute`.
#[derive(Debug, Clone)]
pub struct ExecuteParam {
    /// Key without the leading colon
    pub name:     CompactString,
    pub location: Location
}

/// An `execute` call.
#[derive(Debug, Clone)]
pub struct ExecuteSite {
    pub target:   Target,
    pub method:   MethodId,
    /// `None` when no array is passed; bindings must then supply values.
    pub params:   Option<Vec<ExecuteParam>>,
    pub location: Location
}

/// A fetch whose result is assigned, returned or drives a loop.
#[derive(Debug, Clone)]
pub struct FetchSite {
    /// `None` for a fetch chained directly onto a preparation call
    pub target:     Option<Target>,
    /// Location of the preparation call the fetch is chained onto
    pub chained:    Option<Location>,
    pub method:     MethodId,
    /// One of the three fetch kinds
    pub kind:       CallKind,
    pub guard:      FetchGuard,
    pub location:   Location,
    /// Raw shape annotation text and the location of its statement
    pub annotation: Option<(String, Location)>
}

/// Methods and type aliases making up one analyzed unit.
#[derive(Debug, Clone, Copy)]
pub struct Unit<'a> {
    pub name:    &'a str,
    pub methods: &'a [Method],
    pub aliases: &'a [TypeAlias]
}

/// All facts of one unit.
#[derive(Debug, Default)]
pub struct UnitFacts {
    pub queries:  Vec<QuerySite>,
    pub bindings: Vec<BindingEvent>,
    pub executes: Vec<ExecuteSite>,
    pub fetches:  Vec<FetchSite>
}

impl UnitFacts {
    pub fn collect(unit: Unit<'_>) -> Self {
        let mut facts = Self::default();
        for (method_id, method) in unit.methods.iter().enumerate() {
            facts.collect_method(method_id, &method.body);
        }
        facts.queries.sort_by_key(|q| q.location);
        trace!(
            unit = unit.name,
            queries = facts.queries.len(),
            executes = facts.executes.len(),
            bindings = facts.bindings.len(),
            fetches = facts.fetches.len(),
            "collected unit facts"
        );
        facts
    }

    fn collect_method(&mut self, method: MethodId, body: &[Stmt]) {
        let locals = LocalAssignments::collect(body);
        visit_calls(
            body,
            |call| call.kind != CallKind::Other,
            &mut |cx, role, call| match call.kind {
                CallKind::Prepare | CallKind::Query => {
                    self.record_query(method, cx, &call, &locals)
                }
                CallKind::Execute => self.record_execute(method, &call, &locals),
                CallKind::BindValue | CallKind::BindParam => self.record_binding(method, &call),
                CallKind::Fetch | CallKind::FetchObject | CallKind::FetchAll => {
                    self.record_fetch(method, cx, role, &call)
                }
                CallKind::RowCount | CallKind::Other => {}
            }
        );
    }

    fn record_query(
        &mut self,
        method: MethodId,
        cx: StmtCx<'_>,
        call: &Call<'_>,
        locals: &LocalAssignments<'_>
    ) {
        let target = assigned_target(cx.stmt, call.expr);
        let resolved = call
            .first_arg()
            .and_then(|arg| resolve_query_text(arg, call.location, locals));
        if resolved.is_none() {
            trace!(at = %call.location, "query text not resolved");
        }
        let placeholders = resolved
            .as_ref()
            .map(|r| scan::placeholders(&r.text))
            .unwrap_or_default();
        self.queries.push(QuerySite {
            target,
            method,
            kind: call.kind,
            opaque: resolved.as_ref().is_some_and(|r| r.opaque),
            text: resolved.map(|r| r.text),
            placeholders,
            location: call.location
        });
    }

    fn record_execute(&mut self, method: MethodId, call: &Call<'_>, locals: &LocalAssignments<'_>) {
        let Some(target) = call.receiver.clone() else {
            return;
        };
        let params = match call.first_arg() {
            None => None,
            Some(Expr::Array {
                items, ..
            }) => Some(array_params(items)),
            Some(Expr::Local {
                name, ..
            }) => match locals.latest_before(name, call.location) {
                Some(Expr::Array {
                    items, ..
                }) => Some(array_params(items)),
                _ => return
            },
            Some(_) => return
        };
        self.executes.push(ExecuteSite {
            target,
            method,
            params,
            location: call.location
        });
    }

    fn record_binding(&mut self, method: MethodId, call: &Call<'_>) {
        let (Some(target), Some(Expr::Str {
            value, ..
        })) = (call.receiver.clone(), call.first_arg())
        else {
            return;
        };
        self.bindings.push(BindingEvent {
            target,
            method,
            param: normalize_param(value),
            kind: call.kind,
            location: call.location
        });
    }

    fn record_fetch(&mut self, method: MethodId, cx: StmtCx<'_>, role: Role, call: &Call<'_>) {
        let target = call.receiver.clone();
        if target.is_none() && call.chained.is_none() {
            return;
        }
        let assigned = assigned_target(cx.stmt, call.expr);
        let returned = matches!(
            cx.stmt,
            Stmt::Return { value: Some(value), .. } if std::ptr::eq(value, call.expr)
        );
        if assigned.is_none() && !returned {
            return;
        }
        let guard = guard::detect_guard(cx, role, target.as_ref(), assigned.as_ref());
        let annotation = cx
            .stmt
            .annotation()
            .map(|text| (text.to_string(), cx.stmt.location()));
        self.fetches.push(FetchSite {
            target,
            chained: call.chained,
            method,
            kind: call.kind,
            guard,
            location: call.location,
            annotation
        });
    }

    /// The preparation governing `target` at `at` within `method`.
    ///
    /// Locals resolve to the nearest preceding preparation in the same method.
    /// Fields prefer the nearest preceding preparation in the same method and
    /// otherwise fall back to the first preparation of that field anywhere in
    /// the unit.
    pub fn governing_query(
        &self,
        target: &Target,
        method: MethodId,
        at: Location
    ) -> Option<&QuerySite> {
        let same_method = self
            .queries
            .iter()
            .filter(|q| q.target.as_ref() == Some(target) && q.method == method && q.location <= at)
            .max_by_key(|q| q.location);
        if same_method.is_some() || !target.is_field() {
            return same_method;
        }
        self.queries
            .iter()
            .filter(|q| q.target.as_ref() == Some(target))
            .min_by_key(|q| q.location)
    }

    /// The preparation call at `at` in `method`, for fetches chained onto it.
    pub fn query_at(&self, method: MethodId, at: Location) -> Option<&QuerySite> {
        self.queries
            .iter()
            .find(|q| q.method == method && q.location == at)
    }

    /// Closest preparation visible from `method` located before `at`.
    pub fn closest_query_before(&self, method: MethodId, at: Location) -> Option<&QuerySite> {
        self.queries
            .iter()
            .filter(|q| {
                (q.method == method || q.target.as_ref().is_some_and(Target::is_field))
                    && q.location < at
            })
            .max_by_key(|q| q.location)
    }

    /// Binding events on `target` strictly before `at`.
    ///
    /// Bindings on a local only count within `method`; bindings on a field
    /// count from every method of the unit.
    pub fn bindings_before<'s>(
        &'s self,
        target: &'s Target,
        method: MethodId,
        at: Location
    ) -> impl Iterator<Item = &'s BindingEvent> {
        self.bindings.iter().filter(move |b| {
            &b.target == target
                && (target.is_field() || b.method == method)
                && b.location < at
        })
    }
}

/// Strip the optional leading colon of a parameter name.
pub fn normalize_param(name: &str) -> CompactString {
    CompactString::from(name.strip_prefix(':').unwrap_or(name))
}

fn array_params(items: &[ArrayItem]) -> Vec<ExecuteParam> {
    items
        .iter()
        .filter_map(|item| match &item.key {
            Some(Expr::Str {
                value,
                location
            }) => Some(ExecuteParam {
                name:     normalize_param(value),
                location: *location
            }),
            _ => None
        })
        .collect()
}

/// Target assigned the value of `call`, either by the statement itself or by
/// an assignment expression inside it.
fn assigned_target(stmt: &Stmt, call: &Expr) -> Option<Target> {
    if let Stmt::Assign {
        target,
        value,
        ..
    } = stmt
        && std::ptr::eq(value, call)
    {
        return Some(target.clone());
    }
    let mut found = None;
    for (expr, _) in crate::host::visit::stmt_exprs(stmt) {
        walk_expr(expr, &mut |node| {
            if found.is_none()
                && let Expr::Assign {
                    target,
                    value,
                    ..
                } = node
                && std::ptr::eq(value.as_ref(), call)
            {
                found = Some(target.clone());
            }
        });
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(line: u32) -> Location {
        Location::new(line, 1)
    }

    fn local(name: &str, line: u32) -> Expr {
        Expr::Local {
            name:     name.into(),
            location: loc(line)
        }
    }

    fn method_call(receiver: Expr, method: &str, args: Vec<Expr>, line: u32) -> Expr {
        Expr::Call {
            receiver: Some(Box::new(receiver)),
            method: method.into(),
            args,
            location: Location::new(line, 10)
        }
    }

    fn prepare(target: &str, sql: &str, line: u32) -> Stmt {
        Stmt::Assign {
            target:     Target::Local(target.into()),
            value:      method_call(
                local("pdo", line),
                "prepare",
                vec![Expr::Str {
                    value:    sql.into(),
                    location: Location::new(line, 20)
                }],
                line
            ),
            annotation: None,
            location:   loc(line)
        }
    }

    #[test]
    fn test_collects_query_site_with_placeholders() {
        let methods = vec![Method {
            name:     "find".into(),
            body:     vec![prepare("stmt", "SELECT * FROM t WHERE id = :id", 2)],
            location: loc(1)
        }];
        let facts = UnitFacts::collect(Unit {
            name:    "find",
            methods: &methods,
            aliases: &[]
        });
        assert_eq!(facts.queries.len(), 1);
        assert!(facts.queries[0].placeholders.contains("id"));
        assert_eq!(facts.queries[0].target, Some(Target::Local("stmt".into())));
    }

    #[test]
    fn test_execute_with_unresolvable_argument_is_skipped() {
        let methods = vec![Method {
            name:     "run".into(),
            body:     vec![
                prepare("stmt", "SELECT 1", 2),
                Stmt::Expr {
                    expr:       method_call(
                        local("stmt", 3),
                        "execute",
                        vec![method_call(local("this", 3), "params", vec![], 3)],
                        3
                    ),
                    annotation: None,
                    location:   loc(3)
                },
            ],
            location: loc(1)
        }];
        let facts = UnitFacts::collect(Unit {
            name:    "run",
            methods: &methods,
            aliases: &[]
        });
        assert!(facts.executes.is_empty());
    }

    #[test]
    fn test_nearest_preceding_local_preparation_governs() {
        let methods = vec![Method {
            name:     "run".into(),
            body:     vec![
                prepare("stmt", "SELECT a FROM t WHERE a = :a", 2),
                prepare("stmt", "SELECT b FROM t WHERE b = :b", 5),
            ],
            location: loc(1)
        }];
        let facts = UnitFacts::collect(Unit {
            name:    "run",
            methods: &methods,
            aliases: &[]
        });
        let target = Target::Local("stmt".into());
        let q = facts.governing_query(&target, 0, loc(4)).unwrap();
        assert!(q.placeholders.contains("a"));
        let q = facts.governing_query(&target, 0, loc(9)).unwrap();
        assert!(q.placeholders.contains("b"));
        assert!(facts.governing_query(&target, 1, loc(9)).is_none());
    }

    #[test]
    fn test_unassigned_preparations_get_untargeted_sites() {
        let query = || {
            method_call(
                local("pdo", 2),
                "query",
                vec![Expr::Str {
                    value:    "SELECT 1".into(),
                    location: Location::new(2, 20)
                }],
                2
            )
        };
        let methods = vec![Method {
            name:     "run".into(),
            body:     vec![
                Stmt::Expr {
                    expr:       query(),
                    annotation: None,
                    location:   loc(2)
                },
                Stmt::Return {
                    value:      Some(query()),
                    annotation: None,
                    location:   loc(2)
                },
            ],
            location: loc(1)
        }];
        let facts = UnitFacts::collect(Unit {
            name:    "run",
            methods: &methods,
            aliases: &[]
        });
        assert_eq!(facts.queries.len(), 2);
        assert!(facts.queries.iter().all(|q| q.target.is_none()));
    }

    #[test]
    fn test_chained_fetch_points_at_its_preparation() {
        let chained = method_call(
            method_call(local("pdo", 4), "query", vec![], 4),
            "fetchAll",
            vec![],
            4
        );
        let methods = vec![Method {
            name:     "all".into(),
            body:     vec![Stmt::Assign {
                target:     Target::Local("rows".into()),
                value:      chained,
                annotation: Some("list<array{id: int}>".into()),
                location:   loc(4)
            }],
            location: loc(1)
        }];
        let facts = UnitFacts::collect(Unit {
            name:    "all",
            methods: &methods,
            aliases: &[]
        });
        assert_eq!(facts.queries.len(), 1);
        assert_eq!(facts.queries[0].target, None);
        assert_eq!(facts.fetches.len(), 1);
        let fetch = &facts.fetches[0];
        assert_eq!(fetch.target, None);
        let query = facts.query_at(fetch.method, fetch.chained.unwrap());
        assert!(query.is_some());
    }
}
