use std::{
    env,
    path::{Path, PathBuf},
};

/// Names from `bins` that cannot be resolved to an executable, in input order.
pub fn missing_bins<I, S>(bins: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    bins.into_iter()
        .map(|b| b.as_ref().to_string())
        .filter(|b| which(b).is_none())
        .collect()
}

/// Resolves `bin` like a shell would: paths containing a slash are taken
/// as-is, bare names are searched in `PATH`.
pub fn which(bin: &str) -> Option<PathBuf> {
    if bin.contains('/') {
        let p = Path::new(bin);
        return is_executable(p).then(|| p.to_path_buf());
    }
    let path = env::var_os("PATH")?;
    env::split_paths(&path)
        .map(|dir| dir.join(bin))
        .find(|cand| is_executable(cand))
}

fn is_executable(p: &Path) -> bool {
    let Ok(meta) = std::fs::metadata(p) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}
