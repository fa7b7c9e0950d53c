//! Drill-down listings over the address table: municipality, district, street,
//! house, flat. Each level matches its parents case- and whitespace-insensitively.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use super::domain::{non_blank, normalize_component, Address, Municipality, MunicipalityId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MunicipalityEntry {
    pub id: MunicipalityId,
    pub name: String,
}

/// Municipalities referenced by at least one address, sorted by name.
pub fn municipalities_in_use(
    municipalities: &[Municipality],
    addresses: &[Address],
) -> Vec<MunicipalityEntry> {
    let used: BTreeSet<MunicipalityId> = addresses
        .iter()
        .filter_map(|address| address.municipality_id)
        .collect();

    let names: HashMap<MunicipalityId, &str> = municipalities
        .iter()
        .map(|municipality| (municipality.id, municipality.name.as_str()))
        .collect();

    let mut entries: Vec<MunicipalityEntry> = used
        .into_iter()
        .filter_map(|id| {
            names.get(&id).map(|name| MunicipalityEntry {
                id,
                name: name.to_string(),
            })
        })
        .collect();
    entries.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    entries
}

pub fn districts(addresses: &[Address]) -> Vec<String> {
    distinct(addresses.iter().filter_map(Address::district_or_city))
}

pub fn streets(addresses: &[Address], district: &str) -> Vec<String> {
    distinct(
        addresses
            .iter()
            .filter(|address| address.matches_district(district))
            .filter_map(|address| non_blank(address.street.as_deref())),
    )
}

pub fn houses(addresses: &[Address], district: &str, street: &str) -> Vec<String> {
    distinct(
        addresses
            .iter()
            .filter(|address| address.matches_district(district) && address.matches_street(street))
            .filter_map(Address::house),
    )
}

pub fn flats(addresses: &[Address], district: &str, street: &str, house: &str) -> Vec<String> {
    let house = normalize_component(house);
    distinct(
        addresses
            .iter()
            .filter(|address| {
                address.matches_district(district)
                    && address.matches_street(street)
                    && address.house().map(normalize_component).as_deref() == Some(house.as_str())
            })
            .filter_map(Address::flat),
    )
}

fn distinct<'a, I>(values: I) -> Vec<String>
where
    I: Iterator<Item = &'a str>,
{
    values
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
