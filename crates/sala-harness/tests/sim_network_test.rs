//! Network simulation tests using turmoil.
//!
//! These tests run the production server event loop, connection tasks
//! included, on a simulated network. They verify:
//! - The chat scenarios end to end (nicknames, rooms, private messages, `/bye`)
//! - Per-sender ordering of room messages
//! - Teardown when a peer hangs up without `/bye`
//! - The connection limit

use sala_core::DriverConfig;
use sala_harness::{SimClient, serve};
use sala_proto::Reply;

const PORT: u16 = 7777;
const SERVER: &str = "server:7777";

fn sim_with_server(config: DriverConfig) -> turmoil::Sim<'static> {
    let mut sim = turmoil::Builder::new().build();
    sim.host("server", move || serve(PORT, config.clone()));
    sim
}

async fn named(nick: &str) -> std::io::Result<SimClient> {
    let mut client = SimClient::connect(nick, SERVER).await?;
    assert_eq!(client.call(&format!("/nick {nick}")).await?, Reply::Ok);
    Ok(client)
}

/// alice and bob, both inside `lobby`, with alice's `JOINED bob` consumed.
async fn lobby() -> std::io::Result<(SimClient, SimClient)> {
    let mut alice = named("alice").await?;
    assert_eq!(alice.call("/join lobby").await?, Reply::Ok);
    let mut bob = named("bob").await?;
    assert_eq!(bob.call("/join lobby").await?, Reply::Ok);
    assert_eq!(alice.recv().await?, Reply::Joined { nick: "bob".into() });
    Ok((alice, bob))
}

#[test]
fn duplicate_nickname_is_rejected() {
    let mut sim = sim_with_server(DriverConfig::default());

    sim.client("clients", async {
        let _alice = named("alice").await?;

        let mut other = SimClient::connect("other", SERVER).await?;
        assert_eq!(other.call("/nick alice").await?, Reply::error("Nome já em uso"));
        assert_eq!(other.call("/join lobby").await?, Reply::error("Comando não permitido neste estado"));
        assert_eq!(other.call("/nick alicia").await?, Reply::Ok);
        Ok(())
    });

    sim.run().expect("simulation failed");
}

#[test]
fn room_messages_reach_other_members() {
    let mut sim = sim_with_server(DriverConfig::default());

    sim.client("clients", async {
        let (mut alice, mut bob) = lobby().await?;

        alice.send("hello").await?;
        assert_eq!(bob.recv().await?, Reply::Message { from: "alice".into(), text: "hello".into() });

        // alice's next line is the reply to /leave, not her own message
        assert_eq!(alice.call("/leave").await?, Reply::Ok);
        assert_eq!(bob.recv().await?, Reply::Left { nick: "alice".into() });
        Ok(())
    });

    sim.run().expect("simulation failed");
}

#[test]
fn private_messages_and_unknown_target() {
    let mut sim = sim_with_server(DriverConfig::default());

    sim.client("clients", async {
        let (mut alice, mut bob) = lobby().await?;

        assert_eq!(alice.call("/priv bob secret").await?, Reply::Ok);
        assert_eq!(bob.recv().await?, Reply::Private { from: "alice".into(), text: "secret".into() });
        assert_eq!(alice.call("/priv carol hi").await?, Reply::error("Utilizador não encontrado"));
        Ok(())
    });

    sim.run().expect("simulation failed");
}

#[test]
fn bye_notifies_room_then_closes() {
    let mut sim = sim_with_server(DriverConfig::default());

    sim.client("clients", async {
        let (mut alice, mut bob) = lobby().await?;

        assert_eq!(alice.call("/bye").await?, Reply::Bye);
        alice.expect_closed().await?;
        assert_eq!(bob.recv().await?, Reply::Left { nick: "alice".into() });

        // Nickname is free again, and the room survives with bob alone
        let mut again = named("alice").await?;
        assert_eq!(again.call("/join lobby").await?, Reply::Ok);
        assert_eq!(bob.recv().await?, Reply::Joined { nick: "alice".into() });
        Ok(())
    });

    sim.run().expect("simulation failed");
}

#[test]
fn hang_up_tears_session_down() {
    let mut sim = sim_with_server(DriverConfig::default());

    sim.client("clients", async {
        let (alice, mut bob) = lobby().await?;

        alice.hang_up().await?;
        assert_eq!(bob.recv().await?, Reply::Left { nick: "alice".into() });
        assert_eq!(bob.call("/nick alice").await?, Reply::Ok);
        assert_eq!(bob.call("/priv alice me").await?, Reply::Private { from: "alice".into(), text: "me".into() });
        assert_eq!(bob.recv().await?, Reply::Ok);
        Ok(())
    });

    sim.run().expect("simulation failed");
}

#[test]
fn room_messages_keep_sender_order() {
    let mut sim = sim_with_server(DriverConfig::default());

    sim.client("clients", async {
        let (mut alice, mut bob) = lobby().await?;

        for i in 0..25 {
            alice.send_text(&format!("line {i}")).await?;
        }
        for i in 0..25 {
            let expected = Reply::Message { from: "alice".into(), text: format!("line {i}") };
            assert_eq!(bob.recv().await?, expected);
        }
        Ok(())
    });

    sim.run().expect("simulation failed");
}

#[test]
fn escaped_text_round_trips() {
    let mut sim = sim_with_server(DriverConfig::default());

    sim.client("clients", async {
        let (mut alice, mut bob) = lobby().await?;

        alice.send_text("/nick is a command").await?;
        assert_eq!(
            bob.recv().await?,
            Reply::Message { from: "alice".into(), text: "/nick is a command".into() }
        );
        Ok(())
    });

    sim.run().expect("simulation failed");
}

#[test]
fn connection_limit_closes_extra_clients() {
    let mut sim = sim_with_server(DriverConfig { max_connections: 2, ..DriverConfig::default() });

    sim.client("clients", async {
        let _alice = named("alice").await?;
        let mut bob = named("bob").await?;

        let mut extra = SimClient::connect("extra", SERVER).await?;
        extra.expect_closed().await?;

        // Existing sessions are unaffected
        assert_eq!(bob.call("/join lobby").await?, Reply::Ok);
        Ok(())
    });

    sim.run().expect("simulation failed");
}
