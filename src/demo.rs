//! Demo services and routers wired into the CLI.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info};

use routekit_protocols::error::{ConstructionError, RegistryError};
use routekit_protocols::{
    ConstructionCompletion, Destination, DestinationType, ModuleRoutable, RemoveConfiguration,
    RoutableService, RouteRegistrar, ServiceRouteConfiguration, ServiceRoutable, ServiceRouter,
};

/// Login capability.
pub(crate) trait LoginService: Send + Sync {
    fn login(&self, user: &str) -> Result<String, String>;
    fn sessions(&self) -> Vec<String>;
}
impl ServiceRoutable for dyn LoginService {}

/// Login module configuration.
pub(crate) trait LoginModule: Send + Sync {
    fn realm(&self) -> &str;
}
impl ModuleRoutable for dyn LoginModule {}

/// Token capability, served asynchronously.
pub(crate) trait TokenService: Send + Sync {
    fn issue(&self, subject: &str) -> String;
}
impl ServiceRoutable for dyn TokenService {}

/// Payment capability. No router serves it.
pub(crate) trait PaymentService: Send + Sync {}
impl ServiceRoutable for dyn PaymentService {}

pub(crate) struct LoginServiceImpl {
    realm: String,
    sessions: Mutex<Vec<String>>,
}
impl RoutableService for LoginServiceImpl {}

impl LoginServiceImpl {
    fn logout_all(&self) -> usize {
        let mut sessions = self.sessions.lock();
        let count = sessions.len();
        sessions.clear();
        count
    }
}

impl LoginService for LoginServiceImpl {
    fn login(&self, user: &str) -> Result<String, String> {
        if user.trim().is_empty() {
            return Err("user name is empty".to_string());
        }
        let session = format!("{}@{}", user, self.realm);
        self.sessions.lock().push(session.clone());
        Ok(session)
    }

    fn sessions(&self) -> Vec<String> {
        self.sessions.lock().clone()
    }
}

impl LoginModule for LoginServiceImpl {
    fn realm(&self) -> &str {
        &self.realm
    }
}

pub(crate) struct TokenIssuer {
    prefix: String,
}
impl RoutableService for TokenIssuer {}

impl TokenService for TokenIssuer {
    fn issue(&self, subject: &str) -> String {
        format!("{}-{}-{}", self.prefix, subject, uuid::Uuid::new_v4().simple())
    }
}

/// Synchronous router for the login service, with removal support.
pub(crate) struct LoginRouter;

impl ServiceRouter for LoginRouter {
    fn name(&self) -> &str {
        "login"
    }

    fn register_routable_destination(
        &self,
        registrar: &mut RouteRegistrar<'_>,
    ) -> Result<(), RegistryError> {
        registrar.register_exclusive_service::<LoginServiceImpl>()?;
        registrar.register_service_protocol::<dyn LoginService>()?;
        registrar.register_module_protocol::<dyn LoginModule>()
    }

    fn destination(
        &self,
        configuration: &ServiceRouteConfiguration,
    ) -> Result<Option<Destination>, ConstructionError> {
        let realm: String = configuration
            .param("realm")?
            .ok_or_else(|| ConstructionError::InvalidConfiguration("realm is required".into()))?;

        let login = Arc::new(LoginServiceImpl {
            realm,
            sessions: Mutex::new(Vec::new()),
        });
        Ok(Some(
            Destination::new(login.clone())
                .with_view::<dyn LoginService>(login.clone())
                .with_view::<dyn LoginModule>(login),
        ))
    }

    fn default_configuration(&self, configuration: &mut ServiceRouteConfiguration) {
        configuration.set_param("realm", "main");
    }

    fn supports_removal(&self) -> bool {
        true
    }

    fn remove_destination(
        &self,
        destination: &Destination,
        _configuration: &RemoveConfiguration,
    ) -> Result<(), ConstructionError> {
        let login = destination
            .downcast::<LoginServiceImpl>()
            .ok_or_else(|| ConstructionError::Failed("not a login destination".into()))?;
        let closed = login.logout_all();
        info!(sessions = closed, "Closed login sessions");
        Ok(())
    }
}

/// Asynchronous router issuing tokens from a tokio task.
pub(crate) struct TokenRouter {
    pub delay: Duration,
}

impl Default for TokenRouter {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(25),
        }
    }
}

impl ServiceRouter for TokenRouter {
    fn name(&self) -> &str {
        "token"
    }

    fn register_routable_destination(
        &self,
        registrar: &mut RouteRegistrar<'_>,
    ) -> Result<(), RegistryError> {
        registrar.register_service::<TokenIssuer>()?;
        registrar.register_service_protocol::<dyn TokenService>()
    }

    fn destination(
        &self,
        configuration: &ServiceRouteConfiguration,
    ) -> Result<Option<Destination>, ConstructionError> {
        let prefix = configuration
            .param::<String>("prefix")?
            .unwrap_or_else(|| "tok".to_string());
        let issuer = Arc::new(TokenIssuer { prefix });
        Ok(Some(
            Destination::new(issuer.clone()).with_view::<dyn TokenService>(issuer),
        ))
    }

    fn construct(&self, configuration: &ServiceRouteConfiguration, completion: ConstructionCompletion) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            completion.fail(ConstructionError::Failed(
                "token router needs a tokio runtime".to_string(),
            ));
            return;
        };

        let destination = self.destination(configuration);
        let delay = self.delay;
        handle.spawn(async move {
            tokio::time::sleep(delay).await;
            debug!("Token issuer ready");
            match destination {
                Ok(Some(destination)) => completion.deliver(destination),
                Ok(None) => completion.unavailable("no token issuer"),
                Err(e) => completion.fail(e),
            }
        });
    }

    fn completes_synchronously(&self) -> bool {
        false
    }
}

/// Every demo router, in registration order.
pub(crate) fn demo_routers() -> Vec<Arc<dyn ServiceRouter>> {
    vec![Arc::new(LoginRouter), Arc::new(TokenRouter::default())]
}

/// Destination type for a routable name from the configuration.
pub(crate) fn routable_type(name: &str) -> Option<DestinationType> {
    match name {
        "LoginServiceImpl" => Some(DestinationType::of::<LoginServiceImpl>()),
        "TokenIssuer" => Some(DestinationType::of::<TokenIssuer>()),
        _ => None,
    }
}
