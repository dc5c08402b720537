//! Integration tests for a small in-memory Burrow network
//!
//! These drive full sessions over the mock message bus: real wire
//! encoding, real routing tables, no network.

use burrow_core::transport::mock::{BusEndpoint, MessageBus};
use burrow_core::{BinaryKey, PeerAddress, Resource, Transport};
use burrow_dht::{DhtConfig, RequestOutcome, SHORT_KEY_BITS, SMALL_K};
use burrow_node::Session;

fn config() -> DhtConfig {
    DhtConfig {
        key_bits: SHORT_KEY_BITS,
        k: SMALL_K,
        capacity: 16,
    }
}

fn network(names: &[&str]) -> (Vec<Session>, Vec<BusEndpoint>) {
    let bus = MessageBus::new();
    let mut sessions = Vec::new();
    let mut endpoints = Vec::new();
    for name in names {
        let address = PeerAddress::new(*name).unwrap();
        endpoints.push(bus.endpoint(address.clone()));
        sessions.push(Session::new(address, config()).unwrap());
    }
    (sessions, endpoints)
}

/// Move messages until the network goes quiet
async fn pump(sessions: &mut [Session], endpoints: &[BusEndpoint]) {
    loop {
        let mut progressed = false;
        for (session, endpoint) in sessions.iter_mut().zip(endpoints) {
            for (to, body) in session.flush() {
                progressed = true;
                endpoint.send(&to, body).await.unwrap();
            }
            while let Some(message) = endpoint.try_receive() {
                progressed = true;
                session.handle_message(&message.from, &message.body);
            }
        }
        if !progressed {
            break;
        }
    }
}

#[tokio::test]
async fn store_then_find_value_across_the_network() {
    let (mut sessions, endpoints) = network(&["alice", "bob"]);

    // Bootstrap: both nodes ping each other.
    let bob_address = sessions[1].address().clone();
    let alice_address = sessions[0].address().clone();
    sessions[0].ping(&bob_address).unwrap();
    sessions[1].ping(&alice_address).unwrap();
    pump(&mut sessions, &endpoints).await;

    for session in sessions.iter_mut() {
        assert_eq!(session.known_peers(), 1);
        let outcomes = session.take_outcomes();
        assert_eq!(outcomes.len(), 1);
        assert!(matches!(
            outcomes[0].1,
            RequestOutcome::Ping { reachable: true, .. }
        ));
    }

    // Alice pushes a resource into the network.
    let resource = Resource::new("shared-note", "from alice").unwrap();
    sessions[0].store(resource.clone()).unwrap();
    pump(&mut sessions, &endpoints).await;

    let outcomes = sessions[0].take_outcomes();
    assert_eq!(outcomes.len(), 1);
    let owner = match &outcomes[0].1 {
        RequestOutcome::Store {
            resource: stored,
            new_owner: Some(owner),
        } => {
            assert_eq!(stored, &resource);
            owner.clone()
        }
        other => panic!("store did not converge: {other:?}"),
    };

    // Bob looks it up and gets the value back from its owner.
    let target = resource.key(64).unwrap();
    sessions[1].find_value(target.clone()).unwrap();
    pump(&mut sessions, &endpoints).await;

    let outcomes = sessions[1].take_outcomes();
    assert_eq!(outcomes.len(), 1);
    match &outcomes[0].1 {
        RequestOutcome::FindValue {
            found: Some((from, found_resource)),
            ..
        } => {
            assert_eq!(found_resource, &resource);
            assert_eq!(from, &owner);
        }
        other => panic!("lookup failed: {other:?}"),
    }

    // Alice can find her own resource too.
    sessions[0].find_value(target).unwrap();
    pump(&mut sessions, &endpoints).await;
    let outcomes = sessions[0].take_outcomes();
    assert!(matches!(
        &outcomes[0].1,
        RequestOutcome::FindValue { found: Some(_), .. }
    ));
}

#[tokio::test]
async fn lookup_for_an_unknown_resource_reports_not_found() {
    let (mut sessions, endpoints) = network(&["alice", "bob"]);

    let bob_address = sessions[1].address().clone();
    sessions[0].ping(&bob_address).unwrap();
    pump(&mut sessions, &endpoints).await;
    sessions[0].take_outcomes();

    let target = BinaryKey::hash_bytes(b"no-such-note", 64).unwrap();
    sessions[0].find_value(target.clone()).unwrap();
    pump(&mut sessions, &endpoints).await;

    let outcomes = sessions[0].take_outcomes();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(
        outcomes[0].1,
        RequestOutcome::FindValue {
            target,
            found: None
        }
    );
}

#[tokio::test]
async fn find_node_with_no_contacts_resolves_to_self() {
    let (mut sessions, _endpoints) = network(&["loner"]);
    let session = &mut sessions[0];

    let target = BinaryKey::hash_bytes(b"anywhere", 64).unwrap();
    session.find_node(target.clone()).unwrap();

    let outcomes = session.take_outcomes();
    assert_eq!(outcomes.len(), 1);
    match &outcomes[0].1 {
        RequestOutcome::FindNode { closest, .. } => {
            assert_eq!(closest, session.identity());
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn invites_mesh_the_two_tables() {
    let (mut sessions, endpoints) = network(&["alice", "bob"]);

    let bob_address = sessions[1].address().clone();
    sessions[0].invite(&bob_address).unwrap();
    pump(&mut sessions, &endpoints).await;

    let outcomes = sessions[0].take_outcomes();
    assert!(matches!(
        outcomes[0].1,
        RequestOutcome::Invite { accepted: true, .. }
    ));
    // Each side learned the other from the exchange.
    assert_eq!(sessions[0].known_peers(), 1);
    assert_eq!(sessions[1].known_peers(), 1);
}
