mod fare_api;
mod helpers;
mod history_api;
mod workflow_api;

use std::sync::Arc;

use oso::Oso;

use crate::{
    api::API,
    auth::authorizor,
    error::{unauthorized_error, Error},
    history::HistoryFeed,
    navigation::Navigator,
    session::SessionBackend,
};

use helpers::Registry;

pub struct Engine {
    workflows: Registry,
    sessions: Arc<dyn SessionBackend>,
    navigator: Arc<dyn Navigator>,
    history: Arc<dyn HistoryFeed>,
    authorizor: Oso,
}

impl Engine {
    #[tracing::instrument(name = "Engine::new", skip_all)]
    pub fn new(
        sessions: Arc<dyn SessionBackend>,
        navigator: Arc<dyn Navigator>,
        history: Arc<dyn HistoryFeed>,
    ) -> Result<Self, Error> {
        Ok(Self {
            workflows: Registry::default(),
            sessions,
            navigator,
            history,
            authorizor: authorizor::new()?,
        })
    }

    pub fn authorize<Actor, Action, Resource>(
        &self,
        actor: Actor,
        action: Action,
        resource: Resource,
    ) -> Result<(), Error>
    where
        Actor: oso::ToPolar,
        Action: oso::ToPolar,
        Resource: oso::ToPolar,
    {
        if self.authorizor.is_allowed(actor, action, resource)? {
            return Ok(());
        }

        Err(unauthorized_error())
    }
}

impl API for Engine {}

#[cfg(test)]
pub(crate) fn test_engine() -> (
    Engine,
    Arc<crate::session::MemorySessionBackend>,
    Arc<crate::navigation::RecordingNavigator>,
) {
    use crate::history::{synthesize_records, StaticHistoryFeed};
    use crate::navigation::RecordingNavigator;
    use crate::session::MemorySessionBackend;

    let sessions = Arc::new(MemorySessionBackend::new());
    let navigator = Arc::new(RecordingNavigator::new());
    let history = Arc::new(StaticHistoryFeed::new(synthesize_records(5)));

    let engine = Engine::new(sessions.clone(), navigator.clone(), history).unwrap();

    (engine, sessions, navigator)
}
