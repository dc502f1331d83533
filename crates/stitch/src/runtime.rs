//! The module loader embedded at the top of every bundle.
//!
//! Each registered id owns one record `{ state, factory, module }` in `__registry`:
//!
//! - no record: the id is unregistered and `require` throws synchronously
//! - `"registered"`: the factory is known but has not run
//! - `"evaluating"`: the factory is running; `module.exports` is handed out as-is, which is
//!   what lets circular requires terminate with a partially populated object
//! - `"cached"`: the factory returned; its exports are returned forever after
//!
//! The `module` object is stored before the factory runs so that re-entrant requires see
//! the same exports object the factory is filling in.

/// Name of the registration function emitted before every module body
pub const DEFINE_FN: &str = "__define";

/// Name of the loader's require function
pub const REQUIRE_FN: &str = "__require";

/// Opens the self-invoking wrapper and defines the registry and loader
pub const PRELUDE: &str = r#"(function(){
var __registry = {};
function __define(id, factory){
  __registry[id] = { state: "registered", factory: factory, module: null };
}
function __require(id){
  if(!Object.prototype.hasOwnProperty.call(__registry, id)){
    throw new Error("Cannot find module '" + id + "'");
  }
  var record = __registry[id];
  if(record.state !== "registered") return record.module.exports;
  var module = { exports: {} };
  var factory = record.factory;
  record.module = module;
  record.state = "evaluating";
  factory(__require, module, module.exports);
  record.state = "cached";
  record.factory = null;
  return module.exports;
}"#;

/// Closes the self-invoking wrapper
pub const EPILOGUE: &str = "})();";
