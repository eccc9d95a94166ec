//! Standard invariant checks.

use super::{Invariant, InvariantResult, SystemSnapshot};

/// A session's room and the room's member set agree.
///
/// A session is `Inside` room R iff R's member set contains it. Checked in
/// both directions, so a stale back-pointer and a stale membership entry
/// are both caught.
pub struct MembershipConsistency;

impl Invariant for MembershipConsistency {
    fn name(&self) -> &'static str {
        "membership_consistency"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for session in &state.sessions {
            let inside = session.lifecycle == sala_core::Lifecycle::Inside;
            if inside != session.room.is_some() {
                return Err(self.violation(format!(
                    "session {} is {:?} with room {:?}",
                    session.id, session.lifecycle, session.room
                )));
            }
            if let Some(room) = &session.room {
                let listed = state.rooms.get(room).is_some_and(|m| m.contains(&session.id));
                if !listed {
                    return Err(self.violation(format!(
                        "session {} claims room {room} but is not a member",
                        session.id
                    )));
                }
            }
        }

        for (room, members) in &state.rooms {
            for id in members {
                let claimed = state.session(*id).and_then(|s| s.room.as_deref());
                if claimed != Some(room.as_str()) {
                    return Err(self.violation(format!(
                        "room {room} lists session {id}, whose room is {claimed:?}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// The nickname index and the sessions' nicknames are the same mapping.
///
/// Every named session is indexed under its nickname, and every index entry
/// points at a live session holding that nickname. Together this means no
/// two sessions share a nickname.
pub struct NicknameUniqueness;

impl Invariant for NicknameUniqueness {
    fn name(&self) -> &'static str {
        "nickname_uniqueness"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for session in &state.sessions {
            if let Some(nickname) = &session.nickname {
                if state.nicknames.get(nickname) != Some(&session.id) {
                    return Err(self.violation(format!(
                        "session {} holds {nickname} but index says {:?}",
                        session.id,
                        state.nicknames.get(nickname)
                    )));
                }
            }
        }

        for (nickname, id) in &state.nicknames {
            let holder = state.session(*id).and_then(|s| s.nickname.as_deref());
            if holder != Some(nickname.as_str()) {
                return Err(self.violation(format!(
                    "index maps {nickname} to session {id}, which holds {holder:?}"
                )));
            }
        }
        Ok(())
    }
}

/// Rooms exist only while they have members.
pub struct NoEmptyRooms;

impl Invariant for NoEmptyRooms {
    fn name(&self) -> &'static str {
        "no_empty_rooms"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        match state.rooms.iter().find(|(_, members)| members.is_empty()) {
            Some((room, _)) => Err(self.violation(format!("room {room} has no members"))),
            None => Ok(()),
        }
    }
}
