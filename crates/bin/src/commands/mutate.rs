//! Commands that change the player before it is saved.

use crate::backend::Session;
use crate::cli::{AmountArgs, GrantArgs, ItemArgs, NameArgs};
use crate::player::MAX_HP;

type CommandResult = Result<(), Box<dyn std::error::Error>>;

pub fn damage(session: &Session, args: &AmountArgs) -> CommandResult {
    if args.amount < 0 {
        return Err("damage must not be negative".into());
    }
    let doc = session.record.doc();
    let hp = doc.hp.get();
    let dealt = args.amount.min(hp);
    doc.hp.set(hp - dealt)?;

    let stats = doc.stats.get();
    stats
        .damage_taken
        .set(stats.damage_taken.get() + i64::from(dealt))?;
    Ok(())
}

pub fn heal(session: &Session, args: &AmountArgs) -> CommandResult {
    if args.amount < 0 {
        return Err("healing must not be negative".into());
    }
    let doc = session.record.doc();
    doc.hp.set(doc.hp.get().saturating_add(args.amount).min(MAX_HP))?;
    Ok(())
}

pub fn grant(session: &Session, args: &GrantArgs) -> CommandResult {
    if args.qty <= 0 {
        return Err("quantity must be positive".into());
    }
    let doc = session.record.doc();
    let item = doc.inventory.get_or_insert(args.item.clone())?;
    item.qty.set(item.qty.get().saturating_add(args.qty))?;

    let stats = doc.stats.get();
    stats
        .items_granted
        .set(stats.items_granted.get() + i64::from(args.qty))?;
    Ok(())
}

pub fn drop_item(session: &Session, args: &ItemArgs) -> CommandResult {
    let inventory = &session.record.doc().inventory;
    if !inventory.contains_key(&args.item) {
        return Err(format!("no item named {:?}", args.item).into());
    }
    inventory.remove(&args.item)?;
    Ok(())
}

pub fn spend(session: &Session, args: &AmountArgs) -> CommandResult {
    let energy = &session.record.doc().energy;
    // Credit whatever regenerated while nothing was running.
    energy.catch_up()?;
    let amount = i64::from(args.amount);
    if amount < 0 || amount > energy.get() {
        return Err(format!("cannot spend {amount} energy, have {}", energy.get()).into());
    }
    energy.set(energy.get() - amount)?;
    Ok(())
}

pub fn badge(session: &Session, args: &NameArgs) -> CommandResult {
    let badges = &session.record.doc().badges;
    if badges.to_vec().contains(&args.name) {
        tracing::info!(badge = %args.name, "badge already awarded");
        return Ok(());
    }
    badges.push(args.name.clone())?;
    Ok(())
}
