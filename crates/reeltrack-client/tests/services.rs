use std::sync::Arc;
use std::time::Duration;

use reeltrack_client::{
    CatalogCoordinator, CoordinatorConfig, CounterSync, HubConfig, LoginOutcome, RegisterOutcome,
    ServiceHub, SessionManager,
};
use reeltrack_core::protocol::TOTAL_ITEMS;
use reeltrack_core::{CatalogStore, MemoryCatalog, NewItem, ServiceEndpoint, ServiceRole, TimeFormat};
use reeltrack_services::{spawn, AuthService, CalendarService, ClockService, CounterService};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

struct Peers {
    config: HubConfig,
    _handles: Vec<JoinHandle<()>>,
}

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr").to_string();
    (listener, addr)
}

async fn start_peers() -> Peers {
    let (auth, auth_addr) = bind().await;
    let (calendar, calendar_addr) = bind().await;
    let (clock, clock_addr) = bind().await;
    let (counter, counter_addr) = bind().await;

    let handles = vec![
        spawn(auth, Arc::new(AuthService::new("integration-secret"))),
        spawn(calendar, Arc::new(CalendarService)),
        spawn(clock, Arc::new(ClockService)),
        spawn(counter, Arc::new(CounterService::new())),
    ];

    Peers {
        config: HubConfig {
            auth: ServiceEndpoint::new(ServiceRole::Auth, auth_addr),
            calendar: ServiceEndpoint::new(ServiceRole::Calendar, calendar_addr),
            clock: ServiceEndpoint::new(ServiceRole::Clock, clock_addr),
            counter: ServiceEndpoint::new(ServiceRole::Counter, counter_addr),
            timeout: Duration::from_secs(2),
        },
        _handles: handles,
    }
}

fn sessions(hub: &ServiceHub) -> SessionManager {
    SessionManager::new(hub.auth().clone(), hub.clock().clone())
}

fn coordinator(hub: &ServiceHub, store: Arc<dyn CatalogStore>) -> CatalogCoordinator {
    CatalogCoordinator::new(
        store,
        hub.counter().clone(),
        hub.calendar().clone(),
        CoordinatorConfig::default(),
    )
}

#[tokio::test]
async fn hub_start_connects_every_service() {
    let peers = start_peers().await;
    let hub = ServiceHub::start(peers.config.clone()).await;
    assert_eq!(hub.connected_roles().await.len(), 4);

    hub.shutdown().await;
    assert!(hub.connected_roles().await.is_empty());

    // clients reconnect on demand after shutdown
    let count = hub.counter().get(TOTAL_ITEMS).await.expect("get after shutdown");
    assert_eq!(count, 0);
}

#[tokio::test]
async fn register_login_and_logout() {
    let peers = start_peers().await;
    let hub = ServiceHub::start(peers.config.clone()).await;
    let sessions = sessions(&hub);

    let registered = sessions
        .register("alice", "secret", "secret")
        .await
        .expect("register");
    assert!(matches!(registered, RegisterOutcome::Registered { .. }));

    let outcome = sessions
        .login(None, "alice", "secret", TimeFormat::H12)
        .await
        .expect("login");
    let LoginOutcome::Authenticated { session_id, session, welcome } = outcome else {
        panic!("expected authentication, got {outcome:?}");
    };
    assert_eq!(session.username, "alice");
    assert!(!session.token.is_empty());
    assert!(welcome.starts_with("Welcome, alice! Logged in at "));

    assert!(sessions.logout(session_id));
    assert!(sessions.require(Some(session_id)).is_err());
}

#[tokio::test]
async fn wrong_password_is_rejected_with_message() {
    let peers = start_peers().await;
    let hub = ServiceHub::start(peers.config.clone()).await;
    let sessions = sessions(&hub);
    sessions
        .register("alice", "secret", "secret")
        .await
        .expect("register");

    let outcome = sessions
        .login(None, "alice", "wrong", TimeFormat::H24)
        .await
        .expect("login");
    assert_eq!(
        outcome,
        LoginOutcome::Rejected {
            message: "Invalid username or password".into()
        }
    );
    assert_eq!(sessions.active_sessions(), 0);
}

#[tokio::test]
async fn remove_from_three_leaves_counter_at_two() {
    let peers = start_peers().await;
    let hub = ServiceHub::start(peers.config.clone()).await;
    let store = Arc::new(MemoryCatalog::new());
    let coord = coordinator(&hub, store.clone());

    for title in ["Alien", "Aliens", "Alien 3"] {
        let added = coord.add_item(NewItem::new(title)).await.expect("add");
        assert!(!added.counter.is_drift());
        assert!(!added.value.date_added.is_empty());
    }
    assert_eq!(hub.counter().get(TOTAL_ITEMS).await.expect("get"), 3);

    let removed = coord.remove_item(2).await.expect("remove");
    assert_eq!(removed.counter, CounterSync::Synced { count: 2 });

    let first = hub.counter().get(TOTAL_ITEMS).await.expect("get");
    let second = hub.counter().get(TOTAL_ITEMS).await.expect("get");
    assert_eq!(first, 2);
    assert_eq!(first, second);
}

#[tokio::test]
async fn silent_counter_reports_drift_but_item_is_kept() {
    let mut peers = start_peers().await;
    let (silent, silent_addr) = bind().await;
    let _silent = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = silent.accept().await {
            held.push(stream);
        }
    });
    peers.config.counter = ServiceEndpoint::new(ServiceRole::Counter, silent_addr);
    peers.config.timeout = Duration::from_millis(200);

    let hub = ServiceHub::start(peers.config.clone()).await;
    let store = Arc::new(MemoryCatalog::new());
    let coord = coordinator(&hub, store.clone());

    let added = coord.add_item(NewItem::new("Heat")).await.expect("add");
    assert!(added.counter.is_drift());
    assert_eq!(store.count().expect("count"), 1);

    let err = hub.counter().get(TOTAL_ITEMS).await.expect_err("silent peer");
    assert!(err.is_unavailable());
}
