use axum::http::Method;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

/// Workforce roles. Every user carries exactly one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, ToSchema,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Finance,
    Sales,
    Warehouse,
}

/// One path-prefix gate. `write_only` rules let reads fall through to
/// later rules (or the default of any authenticated user).
struct RouteRule {
    prefix: &'static str,
    write_only: bool,
    roles: &'static [Role],
}

use Role::*;

lazy_static! {
    /// First matching rule wins; anything unmatched is open to any
    /// authenticated user.
    static ref ROUTE_RULES: Vec<RouteRule> = vec![
        RouteRule { prefix: "/api/v1/users", write_only: false, roles: &[Admin] },
        RouteRule { prefix: "/api/v1/company-profile", write_only: true, roles: &[Admin] },
        RouteRule { prefix: "/api/v1/taxes", write_only: true, roles: &[Admin, Finance] },
        RouteRule { prefix: "/api/v1/invoices", write_only: false, roles: &[Admin, Finance] },
        RouteRule { prefix: "/api/v1/payments", write_only: false, roles: &[Admin, Finance] },
        RouteRule { prefix: "/api/v1/receivables", write_only: false, roles: &[Admin, Finance] },
        RouteRule { prefix: "/api/v1/delivery-notes", write_only: false, roles: &[Admin, Warehouse] },
        RouteRule { prefix: "/api/v1/purchase-orders", write_only: false, roles: &[Admin, Finance, Warehouse] },
        RouteRule { prefix: "/api/v1/orders", write_only: false, roles: &[Admin, Finance, Sales] },
        RouteRule { prefix: "/api/v1/customers", write_only: false, roles: &[Admin, Finance, Sales] },
        RouteRule { prefix: "/api/v1/field-visits", write_only: false, roles: &[Admin, Finance, Sales] },
        RouteRule { prefix: "/api/v1/sales-targets", write_only: false, roles: &[Admin, Finance, Sales] },
    ];
}

fn matches_prefix(path: &str, prefix: &str) -> bool {
    path == prefix || path.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('/'))
}

fn is_write(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Whether `role` may hit `path` with `method`.
pub fn authorize(role: Role, path: &str, method: &Method) -> bool {
    let write = is_write(method);
    for rule in ROUTE_RULES.iter() {
        if !matches_prefix(path, rule.prefix) {
            continue;
        }
        if rule.write_only && !write {
            continue;
        }
        return rule.roles.contains(&role);
    }
    true
}
