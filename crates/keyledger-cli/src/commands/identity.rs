//! Register, rotate and refresh commands.

use anyhow::{Context, anyhow, bail};
use chrono::{DateTime, TimeDelta, Utc};
use keyledger_core::{Claim, CoreNode, KeyLink};
use tracing::info;

use super::keys::KeyRing;
use crate::theme::Theme;

/// Expiry `days` from now, never earlier than `floor`.
pub(crate) fn expiry_after(days: i64, floor: Option<DateTime<Utc>>) -> anyhow::Result<DateTime<Utc>> {
    let delta = TimeDelta::try_days(days).ok_or_else(|| anyhow!("{days} days is out of range"))?;
    let expiry = Utc::now()
        .checked_add_signed(delta)
        .ok_or_else(|| anyhow!("expiry {days} days from now is out of range"))?;
    Ok(floor.map_or(expiry, |floor| expiry.max(floor)))
}

async fn current_link(node: &dyn CoreNode, username: &str) -> anyhow::Result<KeyLink> {
    node.get_chain(username)
        .await?
        .pop()
        .ok_or_else(|| anyhow!("{username} is not registered"))
}

fn report(accepted: bool, what: &str) -> anyhow::Result<()> {
    if accepted {
        println!("{}", Theme::success(what));
        Ok(())
    } else {
        println!("{}", Theme::error("The ledger rejected the update"));
        bail!("{what}: rejected")
    }
}

/// Claim `username` with the pending key.
pub(crate) async fn register(
    node: &dyn CoreNode,
    ring: &KeyRing,
    username: &str,
    days: i64,
) -> anyhow::Result<()> {
    let key = ring.pending(username)?;
    let genesis = KeyLink::sign(
        &key,
        &Claim {
            username: username.to_owned(),
            index: 0,
            expiry: expiry_after(days, None)?,
            predecessor: None,
        },
    )?;

    let accepted = node.update_chain(username, &[genesis]).await?;
    if accepted {
        ring.commit_pending(username, 0)?;
        info!(username, key = %key.export_public_key().short_hex(), "Registered");
    }
    report(accepted, &format!("Registered {username}"))
}

/// Hand `username` over from its current key to the pending key.
pub(crate) async fn rotate(
    node: &dyn CoreNode,
    ring: &KeyRing,
    username: &str,
    days: i64,
) -> anyhow::Result<()> {
    let last = current_link(node, username).await?;
    let current = ring.owner_of(username, &last)?;
    let next = ring.pending(username)?;
    let next_pk = next.export_public_key();
    if next_pk == current.export_public_key() {
        bail!("the pending key is already bound to {username}");
    }

    let claim = last.open_claim()?;
    let index = last
        .index()
        .checked_add(1)
        .context("chain index overflow")?;
    let outgoing = last.with_key_change_proof(&current, &next_pk);
    let incoming = KeyLink::sign(
        &next,
        &Claim {
            username: username.to_owned(),
            index,
            expiry: expiry_after(days, Some(claim.expiry))?,
            predecessor: Some(current.export_public_key()),
        },
    )?;

    let accepted = node.update_chain(username, &[outgoing, incoming]).await?;
    if accepted {
        ring.commit_pending(username, index)?;
        info!(username, index, key = %next_pk.short_hex(), "Rotated");
    }
    report(accepted, &format!("Rotated {username} to {}", next_pk.short_hex()))
}

/// Re-sign the current link with a later expiry.
pub(crate) async fn refresh(
    node: &dyn CoreNode,
    ring: &KeyRing,
    username: &str,
    days: i64,
) -> anyhow::Result<()> {
    let last = current_link(node, username).await?;
    let key = ring.owner_of(username, &last)?;
    let claim = last.open_claim()?;
    let expiry = expiry_after(days, Some(claim.expiry))?;
    let renewed = KeyLink::sign(&key, &Claim { expiry, ..claim })?;

    let accepted = node.update_chain(username, &[renewed]).await?;
    report(
        accepted,
        &format!("Refreshed {username} until {}", Theme::timestamp(&expiry)),
    )
}
