//! 5. AuditAnnotation (§4.B.5): ensures the mutable audit-annotation map
//! exists before `ClusterAnnotation` writes into it. `RequestContext`
//! already defaults the map to empty, so this layer's job is purely to
//! guarantee the context itself has been installed — it exists as a named
//! step for chain fidelity, not because there is work left to do.

use axum::{extract::Request, middleware::Next, response::Response};

use super::context_mut;

pub async fn audit_annotation(mut req: Request, next: Next) -> Response {
    context_mut(&mut req);
    next.run(req).await
}
