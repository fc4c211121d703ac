//! Parameter binding for driver queries.

use crate::error::{ReplicaError, ReplicaResult};
use crate::models::{Binds, QueryParam};
use sqlx::Any;
use sqlx::any::AnyArguments;
use sqlx::query::Query;

/// Bind a parameter to a query.
pub(crate) fn bind_param<'q>(
    query: Query<'q, Any, AnyArguments<'q>>,
    param: &'q QueryParam,
) -> Query<'q, Any, AnyArguments<'q>> {
    match param {
        QueryParam::Null => query.bind(None::<String>),
        QueryParam::Bool(v) => query.bind(*v),
        QueryParam::Int(v) => query.bind(*v),
        QueryParam::Float(v) => query.bind(*v),
        QueryParam::String(v) => query.bind(v.as_str()),
        QueryParam::Bytes(v) => query.bind(v.clone()),
    }
}

/// Positional parameters of `binds`, in bind order.
///
/// The drivers only understand positional placeholders, so named binds are
/// rejected instead of being silently dropped.
pub(crate) fn positional_params(binds: &Binds) -> ReplicaResult<&[QueryParam]> {
    if let Some(name) = binds.named.keys().next() {
        return Err(ReplicaError::invalid_input(format!(
            "Named bind '{name}' is not supported by this connection; use positional binds"
        )));
    }
    Ok(&binds.positional)
}
