//! JSON <-> Lua value conversion.

use mlua::prelude::*;
use serde::Serialize;
use serde_json::Value;

/// JSON null becomes the `null` sentinel ([`LuaValue::NULL`]), so an
/// explicit null survives a round trip while absent fields stay `nil`.
pub(crate) fn to_lua<T: Serialize + ?Sized>(lua: &Lua, value: &T) -> LuaResult<LuaValue> {
    let options = LuaSerializeOptions::new()
        .serialize_none_to_null(true)
        .serialize_unit_to_null(true);
    lua.to_value_with(value, options)
}

/// Functions and other non-data values are dropped rather than rejected.
/// The `null` sentinel reads back as JSON null.
pub(crate) fn from_lua(lua: &Lua, value: LuaValue) -> LuaResult<Value> {
    let options = LuaDeserializeOptions::new()
        .deny_unsupported_types(false)
        .deny_recursive_tables(false);
    lua.from_value_with(value, options)
}

/// Flatten an mlua error chain into the message the implementation raised.
pub(crate) fn error_message(err: &LuaError) -> String {
    match err {
        LuaError::RuntimeError(message) | LuaError::MemoryError(message) => message.clone(),
        LuaError::SyntaxError { message, .. } => message.clone(),
        LuaError::CallbackError { cause, .. } => error_message(cause),
        LuaError::WithContext { cause, .. } => error_message(cause),
        LuaError::ExternalError(e) => e.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_fields_stay_distinct_from_absent() {
        let lua = Lua::new();
        let table = to_lua(&lua, &json!({"a": 1, "b": null})).unwrap();
        lua.globals().set("t", table.clone()).unwrap();
        lua.globals().set("null", LuaValue::NULL).unwrap();
        let (a, b_is_null, c_is_nil): (i64, bool, bool) = lua
            .load("return t.a, t.b == null, t.c == nil")
            .eval()
            .unwrap();
        assert_eq!(a, 1);
        assert!(b_is_null);
        assert!(c_is_nil);

        assert_eq!(from_lua(&lua, table).unwrap(), json!({"a": 1, "b": null}));
    }

    #[test]
    fn test_round_trip_keeps_empty_arrays() {
        let lua = Lua::new();
        let value = to_lua(&lua, &json!({"items": []})).unwrap();
        assert_eq!(from_lua(&lua, value).unwrap(), json!({"items": []}));
    }

    #[test]
    fn test_error_message_unwraps_callbacks() {
        let lua = Lua::new();
        let fail = lua
            .create_function(|_, ()| Err::<(), _>(LuaError::runtime("registry said no")))
            .unwrap();
        lua.globals().set("fail", fail).unwrap();
        let err = lua.load("fail()").exec().unwrap_err();
        assert_eq!(error_message(&err), "registry said no");
    }
}
