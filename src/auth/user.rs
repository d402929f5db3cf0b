use async_trait::async_trait;
use axum::extract::{FromRequest, RequestParts};
use oso::PolarClass;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{unauthorized_error, Error};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLES_HEADER: &str = "x-user-roles";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub roles: Vec<String>,
}

impl User {
    pub fn new_rider(id: Uuid) -> Self {
        Self { id, roles: vec![] }
    }

    pub fn new_system_user() -> Self {
        Self {
            id: Uuid::new_v4(),
            roles: vec!["system".into()],
        }
    }

    fn has_role(&self, role: String) -> bool {
        self.roles.iter().any(|x| x == &role)
    }
}

fn parse_roles(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|role| !role.is_empty())
        .map(String::from)
        .collect()
}

#[async_trait]
impl<B> FromRequest<B> for User
where
    B: Send,
{
    type Rejection = Error;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let headers = req.headers();

        let id = headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
            .ok_or_else(unauthorized_error)?;

        let roles = headers
            .get(USER_ROLES_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(parse_roles)
            .unwrap_or_default();

        Ok(Self { id, roles })
    }
}

impl PolarClass for User {
    fn get_polar_class_builder() -> oso::ClassBuilder<User> {
        oso::Class::builder()
            .name("User")
            .add_attribute_getter("id", |recv: &User| recv.id.to_string())
            .add_attribute_getter("roles", |recv: &User| recv.roles.clone())
            .add_method("has_role", User::has_role)
    }

    fn get_polar_class() -> oso::Class {
        let builder = User::get_polar_class_builder();
        builder.build()
    }
}

#[test]
fn roles_header_parsing() {
    assert_eq!(parse_roles("system, support ,,"), vec!["system", "support"]);
    assert!(parse_roles("").is_empty());
}

#[test]
fn user_from_headers() {
    use axum::http::Request;
    use tokio_test::block_on;

    let id = Uuid::new_v4();

    let request = Request::builder()
        .header(USER_ID_HEADER, id.to_string())
        .header(USER_ROLES_HEADER, "system")
        .body(())
        .unwrap();
    let mut parts = RequestParts::new(request);

    let user = block_on(User::from_request(&mut parts)).unwrap();
    assert_eq!(user.id, id);
    assert!(user.has_role("system".into()));

    let request = Request::builder().body(()).unwrap();
    let mut parts = RequestParts::new(request);

    let err = block_on(User::from_request(&mut parts)).unwrap_err();
    assert_eq!(err, unauthorized_error());
}
