//! End-to-end tests: mock acceptor -> connection manager -> intake -> ledger
//!
//! Run with: cargo test --package kiosk-intake --test end_to_end

use std::sync::Arc;
use std::time::Duration;

use kiosk_core::{Amount, StatusSummary};
use kiosk_hardware::mock::{MockCoinAcceptor, MockOpenOutcome, MockPortScanner};
use kiosk_hardware::{AnyPortScanner, ConnectionConfig, ConnectionManager};
use kiosk_intake::{
    AuditLog, CoinIntake, EventBus, IntakeConfig, KioskEvent, Ledger, MemoryBalanceStore,
    TracingAuditSink,
};
use kiosk_protocol::DecoderConfig;
use kiosk_storage::{AuditLogRepository, BalanceRepository, Database};
use kiosk_storage::{SqliteAuditLogRepository, SqliteBalanceRepository};
use tokio::sync::broadcast;

async fn next_matching<F>(events: &mut broadcast::Receiver<KioskEvent>, mut predicate: F) -> KioskEvent
where
    F: FnMut(&KioskEvent) -> bool,
{
    loop {
        let event = events.recv().await.unwrap();
        if predicate(&event) {
            return event;
        }
    }
}

#[tokio::test]
async fn test_coins_are_persisted_and_audited() {
    let db = Database::in_memory().await.unwrap();
    let balance_repo = SqliteBalanceRepository::new(db.pool().clone());
    let audit_repo = SqliteAuditLogRepository::new(db.pool().clone());

    let scanner = MockPortScanner::with_ports(["/dev/ttyUSB0"]);
    let (acceptor, device) = MockCoinAcceptor::new();
    scanner.push_outcome(MockOpenOutcome::Open(acceptor)).await;

    let ledger = Arc::new(Ledger::open(balance_repo.clone()).await.unwrap());
    let bus = EventBus::default();
    let mut events = bus.subscribe();
    let (audit, writer) = AuditLog::channel(audit_repo.clone(), 64);
    let writer = tokio::spawn(writer.run());

    // Generous window so the combined coin never races the timer.
    let config = IntakeConfig::default()
        .decoder(DecoderConfig::default().fragment_timeout(Duration::from_secs(2)));
    let intake = CoinIntake::new(config, ledger.clone(), bus, Arc::new(audit));

    let manager = ConnectionManager::new(
        AnyPortScanner::Mock(scanner.clone()),
        ConnectionConfig::default().reconnect_on_loss(false),
    );
    let (handle, transport) = manager.start();
    let intake = tokio::spawn(intake.run(transport));

    device.send_lines(["10", "5", "2", "0", "7"]).await.unwrap();

    let last = next_matching(&mut events, |e| matches!(e, KioskEvent::ParserWarning { .. })).await;
    assert_eq!(
        last,
        KioskEvent::ParserWarning {
            code: "unsupported_value".to_string(),
            message: "Coin value is not supported".to_string(),
            raw: "7".to_string(),
        }
    );

    device.close();
    let stats = intake.await.unwrap();
    assert_eq!(stats.credited, 3);
    assert_eq!(stats.rejected, 1);
    assert_eq!(writer.await.unwrap(), 4);
    handle.shutdown().await.unwrap();

    assert_eq!(ledger.balance().await, Amount::new(35));
    assert_eq!(balance_repo.load().await.unwrap(), Amount::new(35));
    assert_eq!(audit_repo.count_by_event_type("coin_accepted").await.unwrap(), 3);
    assert_eq!(audit_repo.count_by_event_type("coin_rejected").await.unwrap(), 1);

    let newest_credit = audit_repo
        .find_by_event_type("coin_accepted", 1)
        .await
        .unwrap()
        .remove(0);
    let context = newest_credit.context_value().unwrap().unwrap();
    assert_eq!(context["value"], 20);
    assert_eq!(context["balance"], 35);
    assert_eq!(context["kind"], "combined");

    db.close().await;
}

#[tokio::test]
async fn test_balance_restored_on_restart() {
    let db = Database::in_memory().await.unwrap();
    let repo = SqliteBalanceRepository::new(db.pool().clone());

    {
        let ledger = Ledger::open(repo.clone()).await.unwrap();
        ledger.credit(Amount::new(20)).await.unwrap();
        ledger.credit(Amount::new(5)).await.unwrap();
    }

    let ledger = Ledger::open(repo).await.unwrap();
    assert_eq!(ledger.balance().await, Amount::new(25));
    assert_eq!(ledger.debit(Amount::new(10)).await.unwrap(), Amount::new(15));

    db.close().await;
}

#[tokio::test(start_paused = true)]
async fn test_status_and_timed_out_coin_reach_subscribers() {
    let scanner = MockPortScanner::with_ports(["/dev/ttyACM0"]);
    let (acceptor, device) = MockCoinAcceptor::new();
    scanner.push_outcome(MockOpenOutcome::PermissionDenied).await;
    scanner.push_outcome(MockOpenOutcome::Open(acceptor)).await;

    let ledger = Arc::new(Ledger::open(MemoryBalanceStore::new()).await.unwrap());
    let bus = EventBus::default();
    let mut events = bus.subscribe();
    let intake = CoinIntake::new(
        IntakeConfig::default(),
        ledger.clone(),
        bus,
        Arc::new(TracingAuditSink),
    );

    let manager = ConnectionManager::new(
        AnyPortScanner::Mock(scanner.clone()),
        ConnectionConfig::default()
            .retry_interval(Duration::from_secs(1))
            .reconnect_on_loss(false),
    );
    let (handle, transport) = manager.start();
    let intake = tokio::spawn(intake.run(transport));

    let connected = next_matching(&mut events, |e| {
        matches!(e, KioskEvent::ConnectionStatus(StatusSummary { connected: true, .. }))
    })
    .await;
    assert_eq!(
        connected,
        KioskEvent::ConnectionStatus(StatusSummary {
            connected: true,
            port_path: Some("/dev/ttyACM0".to_string()),
            last_error: None,
        })
    );
    assert_eq!(scanner.open_attempts(), 2);

    device.send_line("1").await.unwrap();
    let accepted = next_matching(&mut events, |e| matches!(e, KioskEvent::CoinAccepted { .. })).await;
    assert_eq!(
        accepted,
        KioskEvent::CoinAccepted {
            value: 1,
            balance: Amount::new(1)
        }
    );

    device.close();
    intake.await.unwrap();
    handle.shutdown().await.unwrap();
    assert_eq!(ledger.balance().await, Amount::new(1));
}
