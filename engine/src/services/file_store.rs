//! JSON文件读写
//!
//! 凭证、设置、历史记录共用的持久化原语。

use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use crate::models::ConfigError;

/// 读取JSON文件
///
/// - 文件不存在: `Ok(None)`
/// - 读取失败: `ConfigError::Io`
/// - 格式错误: `ConfigError::Malformed`
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(ConfigError::Io {
                path: path.display().to_string(),
                message: e.to_string(),
            })
        }
    };

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| ConfigError::Malformed {
            path: path.display().to_string(),
            message: e.to_string(),
        })
}

/// 写入JSON文件 (美化格式,保留中文)
///
/// `owner_only` 为 true 时文件权限为 0600 (仅unix生效)。
pub fn save_json<T: Serialize + ?Sized>(
    path: &Path,
    data: &T,
    owner_only: bool,
) -> Result<(), ConfigError> {
    let io_err = |e: std::io::Error| ConfigError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
    }

    let content = serde_json::to_string_pretty(data).map_err(|e| ConfigError::Malformed {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        if owner_only {
            options.mode(0o600);
        }
    }

    let mut file = options.open(path).map_err(io_err)?;
    file.write_all(content.as_bytes()).map_err(io_err)?;

    // 文件先前已存在时 mode 不生效,需要显式收紧
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if owner_only {
            fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(io_err)?;
        }
    }

    Ok(())
}

/// 删除文件,文件不存在视为成功
pub fn remove_file(path: &Path) -> Result<(), ConfigError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        }),
    }
}
