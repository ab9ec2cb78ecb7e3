use super::ast::{Expr, Location, Target};

/// What a call expression means to the analysis, decided once per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Prepare,
    Query,
    Execute,
    BindValue,
    BindParam,
    Fetch,
    FetchObject,
    FetchAll,
    RowCount,
    Other
}

impl CallKind {
    /// Host method names are case-insensitive.
    pub fn from_method(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "prepare" => Self::Prepare,
            "query" => Self::Query,
            "execute" => Self::Execute,
            "bindvalue" => Self::BindValue,
            "bindparam" => Self::BindParam,
            "fetch" => Self::Fetch,
            "fetchobject" => Self::FetchObject,
            "fetchall" => Self::FetchAll,
            "rowcount" => Self::RowCount,
            _ => Self::Other
        }
    }

    pub fn is_preparation(self) -> bool {
        matches!(self, Self::Prepare | Self::Query)
    }

    pub fn is_binding(self) -> bool {
        matches!(self, Self::BindValue | Self::BindParam)
    }

    pub fn is_fetch(self) -> bool {
        matches!(self, Self::Fetch | Self::FetchObject | Self::FetchAll)
    }

    /// Canonical spelling used in messages.
    pub fn method_name(self) -> &'static str {
        match self {
            Self::Prepare => "prepare",
            Self::Query => "query",
            Self::Execute => "execute",
            Self::BindValue => "bindValue",
            Self::BindParam => "bindParam",
            Self::Fetch => "fetch",
            Self::FetchObject => "fetchObject",
            Self::FetchAll => "fetchAll",
            Self::RowCount => "rowCount",
            Self::Other => "call"
        }
    }
}

/// A classified call expression.
#[derive(Debug, Clone)]
pub struct Call<'a> {
    pub kind:     CallKind,
    /// Field or local the method is invoked on; `None` for free-standing
    /// calls and chained receivers.
    pub receiver: Option<Target>,
    /// Location of the receiver when it is itself a call, as in
    /// `$pdo->query(...)->fetchAll()`
    pub chained:  Option<Location>,
    pub args:     &'a [Expr],
    pub location: Location,
    /// The call expression itself
    pub expr:     &'a Expr
}

impl<'a> Call<'a> {
    pub fn first_arg(&self) -> Option<&'a Expr> {
        self.args.first()
    }
}

/// Classify a call expression. Returns `None` for anything that is not a call.
///
/// Free-standing calls are always [`CallKind::Other`]: database handles are
/// objects, so every recognised operation is a method call.
pub fn classify(expr: &Expr) -> Option<Call<'_>> {
    let Expr::Call {
        receiver,
        method,
        args,
        location
    } = expr
    else {
        return None;
    };
    let kind = match receiver {
        Some(_) => CallKind::from_method(method),
        None => CallKind::Other
    };
    Some(Call {
        kind,
        receiver: receiver.as_deref().and_then(Expr::as_target),
        chained: receiver
            .as_deref()
            .filter(|r| matches!(r, Expr::Call { .. }))
            .map(Expr::location),
        args,
        location: *location,
        expr
    })
}
