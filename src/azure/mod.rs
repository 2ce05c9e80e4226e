//! Outbound Azure API clients.
//!
//! Three collaborators: the Azure AD token endpoint, the Cost Management
//! query API and the Resource Graph tag query. Each is a thin reqwest
//! wrapper returning typed shapes; none of them retries (single attempt per
//! invocation, an intentional extension point).

pub mod costs;
pub mod resources;
pub mod token;
