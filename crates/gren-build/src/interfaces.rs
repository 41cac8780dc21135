//! Module interfaces
//!
//! An interface is the public signature of a compiled module: its exported
//! values with canonical types, plus the unions and aliases those types
//! mention. Interfaces cross package boundaries wrapped in
//! `DependencyInterface`, which encodes visibility: `Public` for a direct
//! consumer, `Private` (values stripped, type information kept) for
//! transitive ones.

use gren_codec::{CodecError, Decode, Encode, Reader};
use std::collections::BTreeMap;
use gren_package::PackageName;

pub type Name = String;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub package: PackageName,
    /// Exported value name -> canonical type.
    pub values: BTreeMap<Name, String>,
    pub unions: BTreeMap<Name, Union>,
    pub aliases: BTreeMap<Name, Alias>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Union {
    pub params: Vec<Name>,
    pub constructors: Vec<Constructor>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constructor {
    pub name: Name,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    pub params: Vec<Name>,
    pub tipe: String,
}

impl Interface {
    pub fn new(package: PackageName) -> Self {
        Self {
            package,
            values: BTreeMap::new(),
            unions: BTreeMap::new(),
            aliases: BTreeMap::new(),
        }
    }

    /// Strip the interface down to what transitive consumers may see:
    /// type structure survives (so types can still line up across package
    /// boundaries), exported values do not.
    pub fn privatized(&self) -> DependencyInterface {
        DependencyInterface::Private {
            package: self.package.clone(),
            unions: self.unions.clone(),
            aliases: self.aliases.clone(),
        }
    }
}

/// An interface tagged with its visibility relative to the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyInterface {
    Public(Interface),
    Private {
        package: PackageName,
        unions: BTreeMap<Name, Union>,
        aliases: BTreeMap<Name, Alias>,
    },
}

impl DependencyInterface {
    pub fn package(&self) -> &PackageName {
        match self {
            DependencyInterface::Public(interface) => &interface.package,
            DependencyInterface::Private { package, .. } => package,
        }
    }

    pub fn public(&self) -> Option<&Interface> {
        match self {
            DependencyInterface::Public(interface) => Some(interface),
            DependencyInterface::Private { .. } => None,
        }
    }

    /// Re-tag for a transitive consumer.
    pub fn privatized(&self) -> DependencyInterface {
        match self {
            DependencyInterface::Public(interface) => interface.privatized(),
            private @ DependencyInterface::Private { .. } => private.clone(),
        }
    }
}

impl Encode for Interface {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.package.encode(buf);
        self.values.encode(buf);
        self.unions.encode(buf);
        self.aliases.encode(buf);
    }
}

impl Decode for Interface {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Interface {
            package: PackageName::decode(reader)?,
            values: BTreeMap::decode(reader)?,
            unions: BTreeMap::decode(reader)?,
            aliases: BTreeMap::decode(reader)?,
        })
    }
}

impl Encode for Union {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.params.encode(buf);
        self.constructors.encode(buf);
    }
}

impl Decode for Union {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Union {
            params: Vec::decode(reader)?,
            constructors: Vec::decode(reader)?,
        })
    }
}

impl Encode for Constructor {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.name.encode(buf);
        self.args.encode(buf);
    }
}

impl Decode for Constructor {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Constructor {
            name: Name::decode(reader)?,
            args: Vec::decode(reader)?,
        })
    }
}

impl Encode for Alias {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.params.encode(buf);
        self.tipe.encode(buf);
    }
}

impl Decode for Alias {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Alias {
            params: Vec::decode(reader)?,
            tipe: String::decode(reader)?,
        })
    }
}

impl Encode for DependencyInterface {
    fn encode(&self, buf: &mut Vec<u8>) {
        match self {
            DependencyInterface::Public(interface) => {
                0u8.encode(buf);
                interface.encode(buf);
            }
            DependencyInterface::Private {
                package,
                unions,
                aliases,
            } => {
                1u8.encode(buf);
                package.encode(buf);
                unions.encode(buf);
                aliases.encode(buf);
            }
        }
    }
}

impl Decode for DependencyInterface {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        match reader.u8()? {
            0 => Ok(DependencyInterface::Public(Interface::decode(reader)?)),
            1 => Ok(DependencyInterface::Private {
                package: PackageName::decode(reader)?,
                unions: BTreeMap::decode(reader)?,
                aliases: BTreeMap::decode(reader)?,
            }),
            tag => Err(CodecError::UnknownTag {
                tag,
                what: "DependencyInterface",
            }),
        }
    }
}
