// File owner lookup for default authors.
//
// On unix the owning uid is mapped to a login name through the system user
// database (NSS, so LDAP and similar sources count); when the uid has no
// entry the numeric uid is used. Other platforms have no owner and yield
// `None`.

use std::path::Path;

/// Login name of the owner of `path`, if it can be determined.
#[cfg(unix)]
pub fn file_owner(path: &Path) -> Option<String> {
    use std::os::unix::fs::MetadataExt;

    let uid = std::fs::metadata(path).ok()?.uid();
    Some(user_name(uid).unwrap_or_else(|| uid.to_string()))
}

#[cfg(not(unix))]
pub fn file_owner(_path: &Path) -> Option<String> {
    None
}

/// Login name of `uid`, or `None` when the user database has no entry.
#[cfg(unix)]
pub fn user_name(uid: u32) -> Option<String> {
    let user = uzers::get_user_by_uid(uid)?;
    let name = user.name().to_string_lossy();
    (!name.is_empty()).then(|| name.into_owned())
}
