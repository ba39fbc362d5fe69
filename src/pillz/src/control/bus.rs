use crate::control::error::{ControlError, ControlResult, Service};
use mockall::automock;
use tracing::info;
use zbus::blocking::Connection;
use zbus::proxy;
use zbus::proxy::CacheProperties;

#[proxy(
    interface = "org.scx.Loader",
    default_service = "org.scx.Loader",
    default_path = "/org/scx/Loader"
)]
trait ScxLoader {
    fn switch_scheduler(&self, scx_name: &str, sched_mode: u32) -> zbus::Result<()>;

    fn stop_scheduler(&self) -> zbus::Result<()>;

    #[zbus(property)]
    fn supported_schedulers(&self) -> zbus::Result<Vec<String>>;
}

#[proxy(
    interface = "com.redhat.tuned.control",
    default_service = "com.redhat.tuned",
    default_path = "/Tuned"
)]
trait TunedControl {
    #[zbus(name = "profiles")]
    fn profiles(&self) -> zbus::Result<Vec<String>>;

    #[zbus(name = "switch_profile")]
    fn switch_profile(&self, profile: &str) -> zbus::Result<(bool, String)>;
}

/// A live connection to both control services.
#[automock]
pub trait ControlSession: Send {
    fn supported_schedulers(&self) -> ControlResult<Vec<String>>;

    fn switch_scheduler(&self, name: &str, mode: u32) -> ControlResult<()>;

    fn stop_scheduler(&self) -> ControlResult<()>;

    fn tuned_profiles(&self) -> ControlResult<Vec<String>>;

    fn switch_tuned_profile(&self, name: &str) -> ControlResult<()>;
}

#[automock]
pub trait BusConnector: Send {
    fn connect(&self) -> ControlResult<Box<dyn ControlSession>>;
}

/// Connects to the system D-Bus.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBus;

impl BusConnector for SystemBus {
    fn connect(&self) -> ControlResult<Box<dyn ControlSession>> {
        let connection = Connection::system().map_err(ControlError::Connection)?;
        info!("Connected to the system bus");
        Ok(Box::new(DbusSession { connection }))
    }
}

struct DbusSession {
    connection: Connection,
}

impl DbusSession {
    // uncached, so advertised names are always fetched live
    fn scx_loader(&self) -> ControlResult<ScxLoaderProxyBlocking<'_>> {
        ScxLoaderProxyBlocking::builder(&self.connection)
            .cache_properties(CacheProperties::No)
            .build()
            .map_err(|e| ControlError::call(Service::ScxLoader, e))
    }

    fn tuned(&self) -> ControlResult<TunedControlProxyBlocking<'_>> {
        TunedControlProxyBlocking::builder(&self.connection)
            .cache_properties(CacheProperties::No)
            .build()
            .map_err(|e| ControlError::call(Service::Tuned, e))
    }
}

impl ControlSession for DbusSession {
    fn supported_schedulers(&self) -> ControlResult<Vec<String>> {
        self.scx_loader()?
            .supported_schedulers()
            .map_err(|e| ControlError::call(Service::ScxLoader, e))
    }

    fn switch_scheduler(&self, name: &str, mode: u32) -> ControlResult<()> {
        self.scx_loader()?
            .switch_scheduler(name, mode)
            .map_err(|e| ControlError::call(Service::ScxLoader, e))
    }

    fn stop_scheduler(&self) -> ControlResult<()> {
        self.scx_loader()?
            .stop_scheduler()
            .map_err(|e| ControlError::call(Service::ScxLoader, e))
    }

    fn tuned_profiles(&self) -> ControlResult<Vec<String>> {
        self.tuned()?
            .profiles()
            .map_err(|e| ControlError::call(Service::Tuned, e))
    }

    fn switch_tuned_profile(&self, name: &str) -> ControlResult<()> {
        let (switched, message) = self
            .tuned()?
            .switch_profile(name)
            .map_err(|e| ControlError::call(Service::Tuned, e))?;
        if switched {
            Ok(())
        } else {
            Err(ControlError::Refused {
                service: Service::Tuned,
                message,
            })
        }
    }
}
