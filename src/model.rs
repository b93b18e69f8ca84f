//! Model definitions.
//!
//! A model is described by a Lua script, `model.lua`, living in the model
//! directory. The script returns a single table; the host keeps that table
//! alive in the Lua registry for the lifetime of the emulator and reads typed
//! fields out of it on demand through [`ModelInfo`].

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use mlua::{Lua, MultiValue, RegistryKey, Table, Value};

use crate::error::{FatalError, ModelInfoError};

/// Handle to the table returned by the model script.
#[derive(Debug)]
pub struct ModelDefinition {
    key: RegistryKey,
    path: PathBuf,
}

impl ModelDefinition {
    /// File name of the model script inside a model directory.
    pub const SCRIPT_NAME: &'static str = "model.lua";

    /// Run the model script at `path` and pin the table it returns.
    pub fn load(lua: &Lua, path: &Path) -> Result<Self, FatalError> {
        // chunks are bytes and need not be UTF-8
        let source = fs::read(path).map_err(|source| FatalError::ModelRead {
            path: path.to_path_buf(),
            source,
        })?;

        let results = lua
            .load(&source[..])
            .set_name(format!("@{}", path.display()))
            .eval::<MultiValue>()
            .map_err(|source| FatalError::ModelLoad {
                path: path.to_path_buf(),
                source,
            })?;

        let table = single_table(results).map_err(|found| FatalError::ModelShape {
            path: path.to_path_buf(),
            found,
        })?;

        let key = lua
            .create_registry_value(table)
            .map_err(|source| FatalError::ModelLoad {
                path: path.to_path_buf(),
                source,
            })?;

        debug!("loaded model definition from {}", path.display());
        Ok(Self {
            key,
            path: path.to_path_buf(),
        })
    }

    /// Script the definition was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Accessor for the field named `key`.
    pub fn info<'a>(&'a self, lua: &'a Lua, key: &str) -> ModelInfo<'a> {
        ModelInfo {
            lua,
            model: self,
            key: key.to_owned(),
        }
    }

    /// Drop the registry entry holding the model table.
    pub fn release(self, lua: &Lua) -> mlua::Result<()> {
        lua.remove_registry_value(self.key)
    }
}

fn single_table(results: MultiValue) -> Result<Table, String> {
    let count = results.len();
    let mut values = results.into_iter();
    match values.next() {
        Some(Value::Table(table)) if count == 1 => Ok(table),
        Some(value) if count == 1 => Err(format!("a {}", value.type_name())),
        _ => Err(format!("{count} values")),
    }
}

/// Lazy, typed view of one field of the model table.
pub struct ModelInfo<'a> {
    lua: &'a Lua,
    model: &'a ModelDefinition,
    key: String,
}

impl ModelInfo<'_> {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The field as a string. Numbers are converted the way Lua prints them.
    pub fn as_string(&self) -> Result<String, ModelInfoError> {
        match self.lookup()? {
            Value::Nil => Err(ModelInfoError::Undefined {
                key: self.key.clone(),
            }),
            Value::String(s) => Ok(s.to_string_lossy().into()),
            Value::Integer(i) => Ok(i.to_string()),
            value @ Value::Number(_) => {
                let type_name = value.type_name();
                match self.lua.coerce_string(value).map_err(|e| self.lua_error(e))? {
                    Some(s) => Ok(s.to_string_lossy().into()),
                    None => Err(ModelInfoError::NotAString {
                        key: self.key.clone(),
                        type_name,
                    }),
                }
            }
            other => Err(ModelInfoError::NotAString {
                key: self.key.clone(),
                type_name: other.type_name(),
            }),
        }
    }

    /// The field as an integer. The whole string form must parse.
    pub fn as_int(&self) -> Result<i32, ModelInfoError> {
        let text = self.as_string()?;
        match text.trim().parse::<i32>() {
            Ok(value) => Ok(value),
            Err(_) => Err(ModelInfoError::NotAnInteger {
                key: self.key.clone(),
                value: text,
            }),
        }
    }

    fn lookup(&self) -> Result<Value, ModelInfoError> {
        let table: Table = self
            .lua
            .registry_value(&self.model.key)
            .map_err(|e| self.lua_error(e))?;
        table
            .get::<Value>(self.key.as_str())
            .map_err(|e| self.lua_error(e))
    }

    fn lua_error(&self, source: mlua::Error) -> ModelInfoError {
        ModelInfoError::Lua {
            key: self.key.clone(),
            source,
        }
    }
}

/// Window geometry and artwork a model asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde-spec", derive(serde::Serialize))]
pub struct InterfaceSpec {
    pub model_name: String,
    pub width: u32,
    pub height: u32,
    /// Interface image, already resolved against the model directory.
    pub image_path: PathBuf,
}

impl InterfaceSpec {
    pub fn from_model(
        lua: &Lua,
        model: &ModelDefinition,
        model_dir: &Path,
    ) -> Result<Self, FatalError> {
        let model_name = model.info(lua, "model_name").as_string()?;
        let width = dimension(model.info(lua, "interface_width"))?;
        let height = dimension(model.info(lua, "interface_height"))?;
        let image = model.info(lua, "interface_image_path").as_string()?;

        Ok(Self {
            model_name,
            width,
            height,
            image_path: model_dir.join(image),
        })
    }
}

fn dimension(info: ModelInfo<'_>) -> Result<u32, FatalError> {
    let value = info.as_int()?;
    u32::try_from(value).map_err(|_| FatalError::InvalidDimension {
        key: info.key().to_owned(),
        value,
    })
}
