// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use std::fs;
use std::path::Path;

use vbind_gen::{generate_bindings, ApiDescriptor, GenConfig, GenError, Generator, LayoutReport};

const API: &str = r#"{
    "callback_structs": [
        { "callback_id": 331, "struct": "GameOverlayActivated_t",
          "fields": [
            { "fieldname": "m_bActive", "fieldtype": "uint8" },
            { "fieldname": "m_bUserInitiated", "fieldtype": "bool" },
            { "fieldname": "m_nAppID", "fieldtype": "AppId_t" },
            { "fieldname": "m_dwOverlayPID", "fieldtype": "uint32" }
          ] },
        { "callback_id": 336, "struct": "FriendRichPresenceUpdate_t",
          "fields": [
            { "fieldname": "m_steamIDFriend", "fieldtype": "uint64" },
            { "fieldname": "m_nAppID", "fieldtype": "AppId_t" }
          ] },
        { "callback_id": 331, "struct": "Dup_t",
          "fields": [ { "fieldname": "m_n", "fieldtype": "int" } ] }
    ],
    "consts": [
        { "constname": "k_cchPersonaNameMax", "consttype": "int", "constval": "128" },
        { "constname": "k_uAPICallInvalid", "consttype": "SteamAPICall_t", "constval": "0x0" }
    ],
    "enums": [
        { "enumname": "EFriendRelationship", "values": [
            { "name": "k_EFriendRelationshipNone", "value": "0" },
            { "name": "k_EFriendRelationshipBlocked", "value": "1" },
            { "name": "k_EFriendRelationshipAlias", "value": "1" },
            { "name": "k_EFriendRelationshipForce32Bit", "value": "0x80000000" }
        ] }
    ],
    "interfaces": [
        { "classname": "ISteamFriends",
          "accessors": [
            { "kind": "user", "name": "SteamFriends", "name_flat": "SteamAPI_SteamFriends_v017" }
          ],
          "methods": [
            { "methodname": "SetPersonaName",
              "methodname_flat": "SteamAPI_ISteamFriends_SetPersonaName",
              "returntype": "SteamAPICall_t",
              "params": [ { "paramname": "pszName", "paramtype": "const char *" } ] },
            { "methodname": "GetFriendsGroupMembersList",
              "methodname_flat": "SteamAPI_ISteamFriends_GetFriendsGroupMembersList",
              "returntype": "void",
              "params": [
                { "paramname": "friendsGroupID", "paramtype": "FriendsGroupID_t" },
                { "paramname": "pOutSteamIDMembers", "paramtype": "CSteamID *",
                  "array_count": "nMembersCount" },
                { "paramname": "nMembersCount", "paramtype": "int" }
              ] },
            { "methodname": "GetOuter",
              "methodname_flat": "SteamAPI_ISteamFriends_GetOuter",
              "returntype": "void",
              "params": [ { "paramname": "pOuter", "paramtype": "Outer_t *" } ] }
          ] }
    ],
    "structs": [
        { "struct": "MatchMakingKeyValuePair_t",
          "fields": [
            { "fieldname": "m_szKey", "fieldtype": "char [256]" },
            { "fieldname": "m_szValue", "fieldtype": "char [256]" }
          ] },
        { "struct": "FriendSummary_t",
          "fields": [
            { "fieldname": "m_eRelationship", "fieldtype": "EFriendRelationship" },
            { "fieldname": "m_pszName", "fieldtype": "const char *" },
            { "fieldname": "m_pFriends", "fieldtype": "ISteamFriends *" },
            { "fieldname": "m_flScore", "fieldtype": "float" }
          ] },
        { "struct": "Dropped_t",
          "fields": [ { "fieldname": "m_n", "fieldtype": "int" } ] },
        { "struct": "Outer_t",
          "fields": [ { "fieldname": "m_inner", "fieldtype": "Dropped_t" } ] },
        { "struct": "Wrapper_t",
          "fields": [
            { "fieldname": "m_pOuter", "fieldtype": "Outer_t *" },
            { "fieldname": "m_nCount", "fieldtype": "int" }
          ] }
    ],
    "typedefs": [
        { "typedef": "uint8", "type": "unsigned char" },
        { "typedef": "uint32", "type": "unsigned int" },
        { "typedef": "uint64", "type": "unsigned long long" },
        { "typedef": "AppId_t", "type": "uint32" },
        { "typedef": "SteamAPICall_t", "type": "uint64" },
        { "typedef": "FriendsGroupID_t", "type": "short" },
        { "typedef": "OuterHandle_t", "type": "Outer_t *" }
    ]
}"#;

const LAYOUT_WINDOWS: &str = r#"{
    "GameOverlayActivated_t": { "size": 12, "align": 4, "fields": [
        { "field": "m_bActive", "size": 1, "align": 1, "offset": 0 },
        { "field": "m_bUserInitiated", "size": 1, "align": 1, "offset": 1 },
        { "field": "m_nAppID", "size": 4, "align": 4, "offset": 4 },
        { "field": "m_dwOverlayPID", "size": 4, "align": 4, "offset": 8 } ] },
    "FriendRichPresenceUpdate_t": { "size": 16, "align": 8, "fields": [
        { "field": "m_steamIDFriend", "size": 8, "align": 8, "offset": 0 },
        { "field": "m_nAppID", "size": 4, "align": 4, "offset": 8 } ] },
    "Dup_t": { "size": 4, "align": 4, "fields": [
        { "field": "m_n", "size": 4, "align": 4, "offset": 0 } ] },
    "MatchMakingKeyValuePair_t": { "size": 512, "align": 1, "fields": [
        { "field": "m_szKey", "size": 256, "align": 1, "offset": 0 },
        { "field": "m_szValue", "size": 256, "align": 1, "offset": 256 } ] },
    "FriendSummary_t": { "size": 32, "align": 8, "fields": [
        { "field": "m_eRelationship", "size": 4, "align": 4, "offset": 0 },
        { "field": "m_pszName", "size": 8, "align": 8, "offset": 8 },
        { "field": "m_pFriends", "size": 8, "align": 8, "offset": 16 },
        { "field": "m_flScore", "size": 4, "align": 4, "offset": 24 } ] },
    "Outer_t": { "size": 4, "align": 4, "fields": [
        { "field": "m_inner", "size": 4, "align": 4, "offset": 0 } ] },
    "Wrapper_t": { "size": 16, "align": 8, "fields": [
        { "field": "m_pOuter", "size": 8, "align": 8, "offset": 0 },
        { "field": "m_nCount", "size": 4, "align": 4, "offset": 8 } ] }
}"#;

const LAYOUT_UNIX: &str = r#"{
    "GameOverlayActivated_t": { "size": 12, "align": 4, "fields": [
        { "field": "m_bActive", "size": 1, "align": 1, "offset": 0 },
        { "field": "m_bUserInitiated", "size": 1, "align": 1, "offset": 1 },
        { "field": "m_nAppID", "size": 4, "align": 4, "offset": 4 } ] },
    "FriendRichPresenceUpdate_t": { "size": 12, "align": 4, "fields": [
        { "field": "m_steamIDFriend", "size": 8, "align": 4, "offset": 0 },
        { "field": "m_nAppID", "size": 4, "align": 4, "offset": 8 } ] },
    "Dup_t": { "size": 4, "align": 4, "fields": [
        { "field": "m_n", "size": 4, "align": 4, "offset": 0 } ] },
    "MatchMakingKeyValuePair_t": { "size": 512, "align": 1, "fields": [
        { "field": "m_szKey", "size": 256, "align": 1, "offset": 0 },
        { "field": "m_szValue", "size": 256, "align": 1, "offset": 256 } ] },
    "FriendSummary_t": { "size": 32, "align": 8, "fields": [
        { "field": "m_eRelationship", "size": 4, "align": 4, "offset": 0 },
        { "field": "m_pszName", "size": 8, "align": 8, "offset": 8 },
        { "field": "m_pFriends", "size": 8, "align": 8, "offset": 16 },
        { "field": "m_flScore", "size": 4, "align": 4, "offset": 24 } ] },
    "Outer_t": { "size": 4, "align": 4, "fields": [
        { "field": "m_inner", "size": 4, "align": 4, "offset": 0 } ] },
    "Wrapper_t": { "size": 16, "align": 8, "fields": [
        { "field": "m_pOuter", "size": 8, "align": 8, "offset": 0 },
        { "field": "m_nCount", "size": 4, "align": 4, "offset": 8 } ] }
}"#;

const CONFIG: &str = r#"
link_name = "steam_api"

[inputs]
api = "steam_api.json"
layout_a = "align-info-windows.json"
layout_b = "align-info-macos.json"

[outputs]
rust = "out/bindings.rs"
shim = "out/shim.cpp"

[shim]
includes = ["steam_api.h"]

[extra_typedefs]
CSteamID = "uint64_t"
"#;

fn write_fixture(dir: &Path) -> std::path::PathBuf {
    fs::write(dir.join("steam_api.json"), API).expect("write api");
    fs::write(dir.join("align-info-windows.json"), LAYOUT_WINDOWS).expect("write layout a");
    fs::write(dir.join("align-info-macos.json"), LAYOUT_UNIX).expect("write layout b");
    let config = dir.join("vbind.toml");
    fs::write(&config, CONFIG).expect("write config");
    config
}

fn inputs() -> (GenConfig, ApiDescriptor, LayoutReport, LayoutReport) {
    let config: GenConfig = toml::from_str(CONFIG).expect("config");
    let api = ApiDescriptor::from_json(API).expect("api");
    let a = LayoutReport::from_json(LAYOUT_WINDOWS).expect("layout a");
    let b = LayoutReport::from_json(LAYOUT_UNIX).expect("layout b");
    (config, api, a, b)
}

#[test]
fn test_generation_is_deterministic() {
    let (config, api, a, b) = inputs();
    let first = generate_bindings(&config, &api, &a, &b).expect("first run");
    let second = generate_bindings(&config, &api, &a, &b).expect("second run");
    assert_eq!(first.rust, second.rust);
    assert_eq!(first.shim, second.shim);
}

#[test]
fn test_generate_writes_outputs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = write_fixture(dir.path());

    let generator = Generator::from_config_file(&config).expect("generator");
    let report = generator.generate().expect("generate");
    assert_eq!(report.files_written.len(), 2);

    let rust = fs::read_to_string(dir.path().join("out/bindings.rs")).expect("bindings");
    let shim = fs::read_to_string(dir.path().join("out/shim.cpp")).expect("shim");

    let (config, api, a, b) = inputs();
    let expected = generate_bindings(&config, &api, &a, &b).expect("in memory");
    assert_eq!(rust, expected.rust);
    assert_eq!(shim, expected.shim);
}

#[test]
fn test_check_writes_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = write_fixture(dir.path());

    let report = Generator::from_config_file(&config)
        .expect("generator")
        .check()
        .expect("check");
    assert!(report.files_written.is_empty());
    assert!(!dir.path().join("out").exists());
}

#[test]
fn test_missing_struct_fact_keeps_siblings() {
    let (config, api, a, b) = inputs();
    let out = generate_bindings(&config, &api, &a, &b).expect("generate");

    assert!(!out.rust.contains("pub struct Dropped_t"));
    assert!(!out.rust.contains("pub struct Outer_t"));
    assert!(out.rust.contains("pub struct MatchMakingKeyValuePair_t {"));
    assert!(out.rust.contains("    pub m_szKey: [u8; 256],\n"));

    let errors = &out.report.errors;
    assert!(errors.iter().any(|e| e.entity == "Dropped_t"
        && matches!(e.error, GenError::MissingLayoutFact { .. })));
    assert!(errors.iter().any(|e| e.entity == "Outer_t"
        && matches!(&e.error, GenError::UnresolvedNamedType { name, .. } if name == "Dropped_t")));
}

#[test]
fn test_pointer_to_dropped_struct_is_pruned() {
    let (config, api, a, b) = inputs();
    let out = generate_bindings(&config, &api, &a, &b).expect("generate");

    // Outer_t is gone, so nothing may name it, not even through a pointer.
    assert!(!out.rust.contains("Outer_t"));
    assert!(!out.rust.contains("pub struct Wrapper_t"));
    assert!(!out.rust.contains("OuterHandle_t"));
    assert!(!out.rust.contains("GetOuter"));
    assert!(out.rust.contains("pub struct MatchMakingKeyValuePair_t {"));
    assert!(out.rust.contains("pub unsafe fn SetPersonaName("));

    let names_outer = |entity: &str| {
        out.report.errors.iter().any(|e| {
            e.entity == entity
                && matches!(&e.error, GenError::UnresolvedNamedType { name, .. } if name == "Outer_t")
        })
    };
    assert!(names_outer("Wrapper_t"));
    assert!(names_outer("OuterHandle_t"));
    assert!(names_outer("ISteamFriends::GetOuter"));
}

#[test]
fn test_structs_get_default_impls() {
    let (config, api, a, b) = inputs();
    let out = generate_bindings(&config, &api, &a, &b).expect("generate");
    let rust = &out.rust;

    assert!(rust.contains(
        "impl Default for FriendSummary_t {\n    fn default() -> Self {\n        Self {\n\
         \x20           m_eRelationship: EFriendRelationship(0),\n\
         \x20           m_pszName: ::core::ptr::null(),\n\
         \x20           m_pFriends: ISteamFriends { ptr: ::core::ptr::null_mut() },\n\
         \x20           m_flScore: 0.0,\n        }\n    }\n}\n"
    ));
    assert!(rust.contains("    pub m_pFriends: ISteamFriends,\n"));
    assert!(rust.contains("            m_szKey: [0; 256],\n"));
    assert!(rust.contains("            m_bActive: false,\n"));
    // AppId_t is a typedef chain down to an unsigned int.
    assert!(rust.contains("            m_nAppID: 0,\n"));
    assert!(rust.contains("            m_steamIDFriend: 0,\n"));
}

#[test]
fn test_missing_field_fact_degrades_field() {
    let (config, api, a, b) = inputs();
    let out = generate_bindings(&config, &api, &a, &b).expect("generate");

    assert!(out.rust.contains(
        "    #[deprecated(note = \"unresolved alignment of `GameOverlayActivated_t::m_dwOverlayPID`\")]\n    pub m_dwOverlayPID: uint32,\n"
    ));
    assert!(out.rust.contains("    pub m_bActive: bool,\n"));
    assert!(out
        .report
        .diagnostics
        .iter()
        .any(|d| matches!(&d.error, GenError::MissingFieldFact { field, .. } if field == "m_dwOverlayPID")));
    assert!(!out
        .report
        .errors
        .iter()
        .any(|e| e.entity == "GameOverlayActivated_t"));
}

#[test]
fn test_callback_union_and_shim() {
    let (config, api, a, b) = inputs();
    let out = generate_bindings(&config, &api, &a, &b).expect("generate");

    assert!(out.rust.contains("    GameOverlayActivated(GameOverlayActivated_t),\n"));
    assert!(out.rust.contains("    FriendRichPresenceUpdate(FriendRichPresenceUpdate_t),\n"));
    assert!(out
        .rust
        .contains("            331 => Some(Self::GameOverlayActivated(::vbind::decode_payload(bytes))),\n"));
    assert!(!out.rust.contains("Dup(Dup_t)"));
    assert!(out.rust.contains("    pub m_steamIDFriend: CSteamID,\n"));
    assert!(out.rust.contains("#[vbind(callback_id = 336)]"));

    assert!(out.shim.contains("case 331: return (int32_t)sizeof(GameOverlayActivated_t);"));
    assert!(!out.shim.contains("sizeof(Dup_t)"));
    assert_eq!(out.report.callbacks_emitted, 2);
    assert!(out.report.errors.iter().any(|e| matches!(
        &e.error,
        GenError::DuplicateCallbackId { id: 331, first, second }
            if first == "GameOverlayActivated_t" && second == "Dup_t"
    )));
    assert!(out
        .report
        .conditional_notes
        .iter()
        .any(|n| n == "FriendRichPresenceUpdate_t.size: 16 on windows, 12 on unix"));
}

#[test]
fn test_enums_and_constants() {
    let (config, api, a, b) = inputs();
    let out = generate_bindings(&config, &api, &a, &b).expect("generate");

    assert!(out.rust.contains("pub struct EFriendRelationship(pub i32);"));
    assert!(out
        .rust
        .contains("    pub const k_EFriendRelationshipBlocked: Self = Self(1);"));
    assert!(!out.rust.contains("k_EFriendRelationshipAlias"));
    assert!(out
        .rust
        .contains("    pub const k_EFriendRelationshipForce32Bit: Self = Self(2147483648_u32 as i32);"));

    assert!(out.rust.contains("pub const k_cchPersonaNameMax: i32 = 128;"));
    assert!(out.rust.contains("pub const k_uAPICallInvalid: SteamAPICall_t = 0x0;"));
}

#[test]
fn test_interface_wrappers() {
    let (config, api, a, b) = inputs();
    let out = generate_bindings(&config, &api, &a, &b).expect("generate");
    let rust = &out.rust;

    assert!(rust.contains("pub struct ISteamFriends {\n    pub ptr: *mut ::core::ffi::c_void,\n}"));
    assert!(rust.contains(
        "    pub unsafe fn SetPersonaName(self, pszName: &::core::ffi::CStr) -> SteamAPICall_t {\n"
    ));
    assert!(rust.contains("SteamAPI_ISteamFriends_SetPersonaName(self.ptr, pszName.as_ptr().cast())"));
    assert!(rust.contains(
        "    pub unsafe fn GetFriendsGroupMembersList(self, friendsGroupID: FriendsGroupID_t, pOutSteamIDMembers: &mut [CSteamID]) {\n"
    ));
    assert!(rust.contains(
        "pOutSteamIDMembers.as_mut_ptr(), i32::try_from(pOutSteamIDMembers.len()).unwrap_or(i32::MAX))"
    ));
    assert!(rust.contains("#[link(name = \"steam_api\")]"));
    assert!(rust.contains("    pub fn SteamAPI_SteamFriends_v017() -> ISteamFriends;\n"));
    assert!(rust.contains("pub unsafe fn SteamFriends() -> ISteamFriends {"));
    assert_eq!(out.report.interfaces_emitted, 1);
    assert_eq!(out.report.methods_emitted, 2);
}
