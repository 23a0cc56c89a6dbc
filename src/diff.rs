//! Diff report: which participant/device pairs only one side uploaded
//!
//! Records are split by uploader into an "us" index and a "them" index
//! (participant id -> device ids). For each participant the report keeps the
//! devices one side has and the other lacks; a participant whose sets are
//! identical drops out of both sides.

use crate::records::Record;
use std::collections::{BTreeMap, BTreeSet};

/// Participant id -> device ids, sorted on both levels
pub type ParticipantDevices = BTreeMap<String, BTreeSet<String>>;

/// Selection applied before records are indexed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffFilter {
    /// Study site: participant ids must start with this character
    pub site: char,
    /// Device ids must contain this substring
    pub device: String,
}

/// Devices only "us" or only "them" uploaded, per participant
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffReport {
    pub us_only: ParticipantDevices,
    pub them_only: ParticipantDevices,
    /// Whether our identity uploaded any record at all, filter aside
    pub our_id_seen: bool,
}

/// Build the "us" and "them" indexes for records matching `filter`
pub fn index_by_uploader(
    records: &[Record],
    filter: &DiffFilter,
    our_id: &str,
) -> (ParticipantDevices, ParticipantDevices) {
    let mut us = ParticipantDevices::new();
    let mut them = ParticipantDevices::new();

    for record in records {
        if !record.participant_id.starts_with(filter.site)
            || !record.device_id.contains(filter.device.as_str())
        {
            continue;
        }

        let side = if record.uploaded_by == our_id {
            &mut us
        } else {
            &mut them
        };
        side.entry(record.participant_id.clone())
            .or_default()
            .insert(record.device_id.clone());
    }

    (us, them)
}

/// Per participant, devices in `left` that `right` does not have
///
/// Participants absent from `right` keep their whole set; an empty
/// difference leaves the participant out.
pub fn exclusive_devices(left: &ParticipantDevices, right: &ParticipantDevices) -> ParticipantDevices {
    left.iter()
        .filter_map(|(participant, devices)| {
            let only: BTreeSet<String> = match right.get(participant) {
                Some(other) => devices.difference(other).cloned().collect(),
                None => devices.clone(),
            };
            (!only.is_empty()).then(|| (participant.clone(), only))
        })
        .collect()
}

/// Compute the diff report for `records`
pub fn diff_report(records: &[Record], filter: &DiffFilter, our_id: &str) -> DiffReport {
    let our_id_seen = records.iter().any(|r| r.uploaded_by == our_id);
    if !our_id_seen {
        tracing::warn!(
            our_id,
            "our_id never appears as an uploader; every record counts as theirs"
        );
    }

    let (us, them) = index_by_uploader(records, filter, our_id);
    tracing::debug!(
        site = %filter.site,
        device = %filter.device,
        us = us.len(),
        them = them.len(),
        "indexed participants"
    );

    DiffReport {
        us_only: exclusive_devices(&us, &them),
        them_only: exclusive_devices(&them, &us),
        our_id_seen,
    }
}
