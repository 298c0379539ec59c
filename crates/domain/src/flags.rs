use bitflags::bitflags;

bitflags! {
    /// What a `DESCRIBE` request asks the gateway to include.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct DescriptionFlags: u32 {
        const INCLUDE_ACCESS_INFORMATION = 0b0000_0001;
        const INCLUDE_DEVICE_INFORMATION = 0b0000_0010;
        const INCLUDE_PROPERTY_INFORMATION = 0b0000_0100;
        const INCLUDE_DRIVER_INFORMATION = 0b0000_1000;
    }
}

bitflags! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct WriteFlags: u32 {
        /// Persist the written value across gateway/device restarts.
        const PERMANENT = 0b0000_0001;
    }
}

bitflags! {
    /// Device function filter for property search.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct DeviceFunctions: u32 {
        const INVERTER = 0b0000_0001;
        const CHARGER = 0b0000_0010;
        const SOLAR = 0b0000_0100;
        const TRANSFER = 0b0000_1000;
        const BATTERY = 0b0001_0000;
        const ALL = Self::INVERTER.bits()
            | Self::CHARGER.bits()
            | Self::SOLAR.bits()
            | Self::TRANSFER.bits()
            | Self::BATTERY.bits();
    }
}

const DESCRIPTION_NAMES: [(DescriptionFlags, &str); 4] = [
    (DescriptionFlags::INCLUDE_ACCESS_INFORMATION, "IncludeAccessInformation"),
    (DescriptionFlags::INCLUDE_DEVICE_INFORMATION, "IncludeDeviceInformation"),
    (DescriptionFlags::INCLUDE_PROPERTY_INFORMATION, "IncludePropertyInformation"),
    (DescriptionFlags::INCLUDE_DRIVER_INFORMATION, "IncludeDriverInformation"),
];

const WRITE_NAMES: [(WriteFlags, &str); 1] = [(WriteFlags::PERMANENT, "Permanent")];

const FUNCTION_NAMES: [(DeviceFunctions, &str); 5] = [
    (DeviceFunctions::INVERTER, "inverter"),
    (DeviceFunctions::CHARGER, "charger"),
    (DeviceFunctions::SOLAR, "solar"),
    (DeviceFunctions::TRANSFER, "transfer"),
    (DeviceFunctions::BATTERY, "battery"),
];

fn join_names<F: bitflags::Flags + Copy>(flags: F, table: &[(F, &str)]) -> String {
    table
        .iter()
        .filter(|(flag, _)| flags.contains(*flag))
        .map(|(_, name)| *name)
        .collect::<Vec<_>>()
        .join(",")
}

fn parse_names<F: bitflags::Flags + Copy>(raw: &str, table: &[(F, &str)]) -> F {
    let mut flags = F::empty();
    for token in raw.split(',').map(str::trim) {
        if let Some((flag, _)) = table.iter().find(|(_, name)| *name == token) {
            flags.insert(*flag);
        }
    }
    flags
}

impl DescriptionFlags {
    /// Comma-joined names for the text protocol `flags` header.
    pub fn to_wire(self) -> String {
        join_names(self, &DESCRIPTION_NAMES)
    }

    pub fn from_wire(raw: &str) -> Self {
        parse_names(raw, &DESCRIPTION_NAMES)
    }
}

impl WriteFlags {
    pub fn to_wire(self) -> String {
        join_names(self, &WRITE_NAMES)
    }

    pub fn from_wire(raw: &str) -> Self {
        parse_names(raw, &WRITE_NAMES)
    }
}

impl DeviceFunctions {
    /// Lowercase token list; the complete set collapses to `all`.
    pub fn to_wire(self) -> String {
        if self.contains(Self::ALL) {
            return "all".into();
        }
        join_names(self, &FUNCTION_NAMES)
    }

    pub fn from_wire(raw: &str) -> Self {
        if raw.split(',').any(|t| t.trim() == "all") {
            return Self::ALL;
        }
        parse_names(raw, &FUNCTION_NAMES)
    }
}
