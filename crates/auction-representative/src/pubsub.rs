//! The request/response pub-sub reference transport for a representative.
//!
//! Mirrors [`crate::http`] verb-for-verb, but addressed by NATS subject
//! (`rep.<guid>.<verb>`) instead of HTTP routes. The server always publishes
//! a reply, including a sentinel error payload on decode failure, so that a
//! waiting auctioneer never blocks past its own transport timeout.

use auction_types::Instance;
use futures::StreamExt as _;
use tokio_util::sync::CancellationToken;
use tracing::{
    error,
    warn,
};

use crate::Representative;

/// Sentinel payload published when a request cannot be decoded or a verb is
/// unrecognized. Distinguishable from any valid JSON score or instance list.
const ERROR_SENTINEL: &[u8] = b"error";

fn subject_prefix(guid: &str) -> String {
    format!("rep.{guid}.")
}

/// Subscribes to every `rep.<guid>.<verb>` subject for `rep` and serves
/// requests until `shutdown` fires.
pub async fn spawn(
    client: async_nats::Client,
    rep: Representative,
    shutdown: CancellationToken,
) -> Result<tokio::task::JoinHandle<()>, async_nats::SubscribeError> {
    let wildcard = format!("{}>", subject_prefix(rep.guid()));
    let mut subscriber = client.subscribe(wildcard).await?;

    Ok(tokio::spawn(async move {
        let prefix = subject_prefix(rep.guid());
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                message = subscriber.next() => {
                    let Some(message) = message else { break };
                    handle(&client, &rep, &prefix, message).await;
                }
            }
        }
    }))
}

async fn handle(
    client: &async_nats::Client,
    rep: &Representative,
    prefix: &str,
    message: async_nats::Message,
) {
    let Some(reply) = message.reply.clone() else {
        warn!(subject = %message.subject, "request had no reply subject; dropping");
        return;
    };
    let Some(verb) = message.subject.as_str().strip_prefix(prefix) else {
        publish(client, &reply, ERROR_SENTINEL.to_vec()).await;
        return;
    };

    let response = match dispatch(rep, verb, &message.payload) {
        Ok(payload) => payload,
        Err(()) => ERROR_SENTINEL.to_vec(),
    };
    publish(client, &reply, response).await;
}

async fn publish(client: &async_nats::Client, reply: &async_nats::Subject, payload: Vec<u8>) {
    if let Err(error) = client.publish(reply.clone(), payload.into()).await {
        error!(%error, "failed to publish representative reply");
    }
}

fn dispatch(rep: &Representative, verb: &str, payload: &[u8]) -> Result<Vec<u8>, ()> {
    match verb {
        "total_resources" => Ok(serde_json::to_vec(&rep.total_resources()).map_err(drop)?),
        "instances" => Ok(serde_json::to_vec(&rep.instances()).map_err(drop)?),
        "reset" => {
            rep.reset();
            Ok(Vec::new())
        }
        "set_instances" => {
            let instances: Vec<Instance> = serde_json::from_slice(payload).map_err(drop)?;
            rep.set_instances(instances);
            Ok(Vec::new())
        }
        "vote" => {
            let instance: Instance = serde_json::from_slice(payload).map_err(drop)?;
            let score = rep.vote(&instance).map_err(drop)?;
            Ok(serde_json::to_vec(&score).map_err(drop)?)
        }
        "reserve_and_recast_vote" => {
            let instance: Instance = serde_json::from_slice(payload).map_err(drop)?;
            let score = rep.reserve_and_recast_vote(&instance).map_err(drop)?;
            Ok(serde_json::to_vec(&score).map_err(drop)?)
        }
        "release" => {
            let instance: Instance = serde_json::from_slice(payload).map_err(drop)?;
            rep.release(&instance);
            Ok(Vec::new())
        }
        "claim" => {
            let instance: Instance = serde_json::from_slice(payload).map_err(drop)?;
            rep.claim(&instance);
            Ok(Vec::new())
        }
        _ => Err(()),
    }
}

#[cfg(test)]
mod tests {
    use auction_types::AppGuid;

    use super::*;
    use crate::Representative;

    fn instance(app: &str, resources: u32) -> Instance {
        Instance::new(AppGuid::new(app), resources)
    }

    #[test]
    fn unknown_verb_is_rejected() {
        let rep = Representative::new("rep-1", 100);
        assert_eq!(dispatch(&rep, "not_a_verb", &[]), Err(()));
    }

    #[test]
    fn malformed_payload_is_rejected() {
        let rep = Representative::new("rep-1", 100);
        assert_eq!(dispatch(&rep, "vote", b"not json"), Err(()));
    }

    #[test]
    fn total_resources_reports_capacity() {
        let rep = Representative::new("rep-1", 100);
        let payload = dispatch(&rep, "total_resources", &[]).unwrap();
        assert_eq!(serde_json::from_slice::<u32>(&payload).unwrap(), 100);
    }

    #[test]
    fn reset_and_set_instances_replace_the_table() {
        let rep = Representative::new("rep-1", 100);
        let inst = instance("app", 10);
        let payload = serde_json::to_vec(&vec![inst.clone()]).unwrap();

        dispatch(&rep, "set_instances", &payload).unwrap();
        assert_eq!(rep.instances().len(), 1);

        dispatch(&rep, "reset", &[]).unwrap();
        assert!(rep.instances().is_empty());
    }

    #[test]
    fn instances_lists_what_was_set() {
        let rep = Representative::new("rep-1", 100);
        let inst = instance("app", 10);
        rep.set_instances(vec![inst.clone()]);

        let payload = dispatch(&rep, "instances", &[]).unwrap();
        let listed: Vec<Instance> = serde_json::from_slice(&payload).unwrap();
        assert_eq!(listed, vec![inst]);
    }

    #[test]
    fn vote_scores_without_reserving() {
        let rep = Representative::new("rep-1", 100);
        let inst = instance("app", 10);
        let payload = serde_json::to_vec(&inst).unwrap();

        let response = dispatch(&rep, "vote", &payload).unwrap();
        let _score: f64 = serde_json::from_slice(&response).unwrap();
        assert!(rep.instances().is_empty());
    }

    #[test]
    fn vote_on_a_full_representative_is_rejected() {
        let rep = Representative::new("rep-1", 5);
        let inst = instance("app", 10);
        let payload = serde_json::to_vec(&inst).unwrap();
        assert_eq!(dispatch(&rep, "vote", &payload), Err(()));
    }

    #[test]
    fn reserve_release_and_claim_round_trip() {
        let rep = Representative::new("rep-1", 100);
        let inst = instance("app", 10);
        let payload = serde_json::to_vec(&inst).unwrap();

        dispatch(&rep, "reserve_and_recast_vote", &payload).unwrap();
        assert!(rep.instances()[0].tentative);

        dispatch(&rep, "release", &payload).unwrap();
        assert!(rep.instances().is_empty());

        dispatch(&rep, "reserve_and_recast_vote", &payload).unwrap();
        dispatch(&rep, "claim", &payload).unwrap();
        assert!(!rep.instances()[0].tentative);
    }
}
