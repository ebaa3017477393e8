pub mod auth;
pub mod config;
pub mod entity;
pub mod error;
pub mod ids;
pub mod logging;
pub mod models;
pub mod progress;
pub mod service;
pub mod storage;
mod time;

use tokio::sync::OnceCell;

use std::{sync::Arc, time::Duration};

use iroh::{endpoint::Connection, Endpoint};
use tracing::info;
use zel_core::{prelude::RpcServerBuilder, protocol::RpcClient, IrohBundle};

use crate::{
    config::JornadaConfig,
    error::StartError,
    service::{
        auth::{AuthClient, AuthServer, AuthService},
        avatars::{AvatarsClient, AvatarsServer, AvatarsService},
        events::{EventsClient, EventsServer, EventsService},
        forum::{ForumClient, ForumServer, ForumService},
        members::{MembersClient, MembersServer, MembersService},
        pages::{PagesClient, PagesServer, PagesService},
        profiles::{ProfilesClient, ProfilesServer, ProfilesService},
        progress::{ProgressClient, ProgressServer, ProgressService},
        projects::{ProjectsClient, ProjectsServer, ProjectsService},
        roles::{RoleGate, RolesClient, RolesServer, RolesService},
    },
    storage::{BlobStore, UrlSigner},
};

static JORNADA_CORE: OnceCell<Arc<JornadaCore>> = OnceCell::const_new();
static ALPN: &[u8] = b"jornada::0.1.0";

/// Process-wide core, started on first use.
pub async fn core() -> Result<Arc<JornadaCore>, StartError> {
    JORNADA_CORE
        .get_or_try_init(|| async move { JornadaCore::start().await.map(Arc::new) })
        .await
        .cloned()
}

/// Typed clients for every service of the local server.
pub struct Clients {
    pub auth: AuthClient,
    pub roles: RolesClient,
    pub profiles: ProfilesClient,
    pub projects: ProjectsClient,
    pub members: MembersClient,
    pub progress: ProgressClient,
    pub events: EventsClient,
    pub forum: ForumClient,
    pub avatars: AvatarsClient,
    pub pages: PagesClient,
}

impl Clients {
    async fn connect(conn: &Connection) -> Result<Self, StartError> {
        async fn rpc(conn: &Connection) -> Result<RpcClient, StartError> {
            RpcClient::new(conn.clone()).await.map_err(StartError::network)
        }

        Ok(Self {
            auth: AuthClient::new(rpc(conn).await?),
            roles: RolesClient::new(rpc(conn).await?),
            profiles: ProfilesClient::new(rpc(conn).await?),
            projects: ProjectsClient::new(rpc(conn).await?),
            members: MembersClient::new(rpc(conn).await?),
            progress: ProgressClient::new(rpc(conn).await?),
            events: EventsClient::new(rpc(conn).await?),
            forum: ForumClient::new(rpc(conn).await?),
            avatars: AvatarsClient::new(rpc(conn).await?),
            pages: PagesClient::new(rpc(conn).await?),
        })
    }
}

/// Main runtime handle for Jornada.
pub struct JornadaCore {
    pub config: JornadaConfig,

    /// Server bundle that accepts inbound RPC traffic.
    pub server: IrohBundle,

    /// Client-side endpoint used by a front-end to reach the local server.
    pub client_endpoint: Endpoint,

    /// Typed clients for the local server.
    pub clients: Clients,
}

impl JornadaCore {
    pub async fn start() -> Result<Self, StartError> {
        let config = config::get_or_init().await?;
        Self::start_with(config).await
    }

    pub async fn start_with(config: JornadaConfig) -> Result<Self, StartError> {
        info!(database = %config.database_path().display(), "starting jornada");

        // ----------------
        // Server endpoint
        // ----------------
        let mut server_builder = IrohBundle::builder(Some(config.secret_key.clone()))
            .await
            .map_err(StartError::network)?;
        let server_endpoint = server_builder.endpoint().clone();

        // DB + migrations
        let db = models::open_or_create_db(&config).await?;
        models::migrate_up(&db).await?;

        let roles = RoleGate::new(db.clone());
        let signer = UrlSigner::new(&config.storage_key()?, config.signed_url_ttl_secs)
            .map_err(|_| StartError::InvalidConfig("storage_secret is too short"))?;
        let store = BlobStore::new(db.clone(), signer);

        let auth_service = AuthService::new(db.clone(), roles.clone());
        let roles_service = RolesService::new(db.clone(), roles.clone());
        let profiles_service = ProfilesService::new(db.clone());
        let projects_service = ProjectsService::new(db.clone(), roles.clone());
        let members_service = MembersService::new(db.clone(), roles.clone());
        let progress_service = ProgressService::new(db.clone());
        let events_service = EventsService::new(db.clone(), roles.clone());
        let forum_service = ForumService::new(db.clone(), roles.clone());
        let avatars_service = AvatarsService::new(db.clone(), store, config.max_avatar_bytes);
        let pages_service = PagesService::new(
            db.clone(),
            roles,
            projects_service.clone(),
            members_service.clone(),
            progress_service.clone(),
            events_service.clone(),
            forum_service.clone(),
            profiles_service.clone(),
            avatars_service.clone(),
        );

        // Register RPC servers
        let rpc_server_builder = RpcServerBuilder::new(ALPN, server_endpoint.clone());

        let rpc_server_builder = auth_service.register_service(rpc_server_builder);
        let rpc_server_builder = roles_service.register_service(rpc_server_builder);
        let rpc_server_builder = profiles_service.register_service(rpc_server_builder);
        let rpc_server_builder = projects_service.register_service(rpc_server_builder);
        let rpc_server_builder = members_service.register_service(rpc_server_builder);
        let rpc_server_builder = progress_service.register_service(rpc_server_builder);
        let rpc_server_builder = events_service.register_service(rpc_server_builder);
        let rpc_server_builder = forum_service.register_service(rpc_server_builder);
        let rpc_server_builder = avatars_service.register_service(rpc_server_builder);
        let rpc_server_builder = pages_service.register_service(rpc_server_builder);

        let rpc_server = rpc_server_builder.build();

        let server = server_builder.accept(ALPN, rpc_server).finish().await;

        server.wait_online().await;
        info!(node_id = %server.endpoint.id(), "server online");

        // ----------------
        // Client endpoint
        // ----------------
        let client_endpoint = Endpoint::builder()
            .secret_key(config.client_secret_key.clone())
            .alpns(vec![ALPN.to_vec()])
            .bind()
            .await
            .map_err(StartError::network)?;

        client_endpoint.online().await;

        // Connect client endpoint -> server endpoint
        let conn = client_endpoint
            .connect(server.endpoint.addr(), ALPN)
            .await
            .map_err(StartError::network)?;

        let clients = Clients::connect(&conn).await?;

        Ok(Self {
            config,
            server,
            client_endpoint,
            clients,
        })
    }

    pub async fn shutdown(self) -> Result<(), StartError> {
        // Close client endpoint
        self.client_endpoint.close().await;

        // Shutdown server bundle
        self.server
            .shutdown(Duration::from_secs(5))
            .await
            .map_err(StartError::network)?;

        info!("jornada stopped");
        Ok(())
    }
}

pub mod prelude {
    pub use super::config;
    pub use super::entity;
    pub use super::error;
    pub use super::ids;
    pub use super::models;
    pub use super::service;

    pub use super::{core, Clients, JornadaCore};

    pub use zel_core;
}
