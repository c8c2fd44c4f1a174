//! Party blocks: sender, receiver and cc names and addresses

use crate::grid::GridConfig;
use crate::layout::Placement;
use serde::{Deserialize, Serialize};

/// Party role on the letter form
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    Sender,
    Receiver,
    Cc,
}

impl Role {
    /// All roles in drawing order
    pub const ALL: [Role; 3] = [Role::Sender, Role::Receiver, Role::Cc];

    /// Key of this role's slot geometry in the configuration file
    pub fn config_key(self) -> &'static str {
        match self {
            Role::Sender => "sender",
            Role::Receiver => "receiver",
            Role::Cc => "cc",
        }
    }
}

/// One name and address pair
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Party {
    pub name: String,
    pub address: String,
}

impl Party {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

/// Parties of one role, never empty
///
/// An empty input becomes a single empty-string entry, so layout code can
/// always draw the first entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartyList {
    parties: Vec<Party>,
}

impl PartyList {
    pub fn new(parties: Vec<Party>) -> Self {
        if parties.is_empty() {
            Self {
                parties: vec![Party::default()],
            }
        } else {
            Self { parties }
        }
    }

    pub fn len(&self) -> usize {
        self.parties.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = &Party> {
        self.parties.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.parties.iter().map(|p| p.name.as_str())
    }

    /// The one address drawn for this role
    pub fn first_address(&self) -> &str {
        self.parties
            .first()
            .map(|p| p.address.as_str())
            .unwrap_or_default()
    }

    pub fn as_slice(&self) -> &[Party] {
        &self.parties
    }
}

impl Default for PartyList {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl From<Vec<Party>> for PartyList {
    fn from(parties: Vec<Party>) -> Self {
        Self::new(parties)
    }
}

/// The three party lists of one letter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parties {
    pub sender: PartyList,
    pub receiver: PartyList,
    pub cc: PartyList,
}

impl Parties {
    pub fn get(&self, role: Role) -> &PartyList {
        match role {
            Role::Sender => &self.sender,
            Role::Receiver => &self.receiver,
            Role::Cc => &self.cc,
        }
    }
}

/// Placements for one role's names and address
///
/// Name `i` goes to `name_x_begin + i * name_x_interval` on the name row.
/// Only the first address is drawn; the form has one address slot per role.
pub fn fill_party_block(role: Role, parties: &PartyList, grid: &GridConfig) -> Vec<Placement> {
    let ignored = parties
        .iter()
        .skip(1)
        .filter(|p| !p.address.is_empty())
        .count();
    if ignored > 0 {
        log::warn!(
            "Only the first {} address is drawn; ignoring {} more",
            role.config_key(),
            ignored
        );
    }

    let names: Vec<&str> = parties.names().collect();
    fill_slots(role, &names, Some(parties.first_address()), grid)
}

/// Placements for a row of names and an optional address
pub(crate) fn fill_slots(
    role: Role,
    names: &[&str],
    address: Option<&str>,
    grid: &GridConfig,
) -> Vec<Placement> {
    let slot = grid.slot(role);
    let size = grid.party_font_size;

    let mut placements: Vec<Placement> = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            Placement::new(
                *name,
                slot.name_x_begin + i as f64 * slot.name_x_interval,
                slot.name_y_begin,
                size,
            )
        })
        .collect();

    if let Some(address) = address {
        placements.push(Placement::new(
            address,
            slot.addr_x_begin,
            slot.addr_y_begin,
            size,
        ));
    }

    placements
}

/// Placements for sender, receiver and cc, in that order
pub fn fill_party_blocks(parties: &Parties, grid: &GridConfig) -> Vec<Placement> {
    Role::ALL
        .into_iter()
        .flat_map(|role| fill_party_block(role, parties.get(role), grid))
        .collect()
}
