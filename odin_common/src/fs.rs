/*
 * Copyright © 2024, United States Government, as represented by the Administrator of
 * the National Aeronautics and Space Administration. All rights reserved.
 *
 * The “ODIN” software is licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License. You may obtain a copy
 * of the License at http://www.apache.org/licenses/LICENSE-2.0.
 *
 * Unless required by applicable law or agreed to in writing, software distributed under
 * the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND,
 * either express or implied. See the License for the specific language governing permissions
 * and limitations under the License.
 */

use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path,PathBuf};

type Result<T> = std::result::Result<T,std::io::Error>;

pub fn filename<'a,T: AsRef<Path>> (path: &'a T)->Option<&'a str> {
    path.as_ref().file_name().and_then(|ostr| ostr.to_str())
}

pub fn ensure_dir (path: impl AsRef<Path>)->Result<()> {
    let path = path.as_ref();
    if !path.is_dir() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

/// check if dir pathname exists and is writable, try to create dir otherwise
pub fn ensure_writable_dir (path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if path.is_dir() {
        let md = fs::metadata(&path)?;
        if md.permissions().readonly() {
            Err( io::Error::new( ErrorKind::PermissionDenied, format!("dir {:?} not writable", path)))
        } else {
            Ok(())
        }
    } else {
        fs::create_dir_all(path)
    }
}

/// the sibling path we use to write files before they become visible under `path`,
/// e.g. `img.png` -> `img.png.part`
pub fn part_path (path: impl AsRef<Path>)->PathBuf {
    let path = path.as_ref();
    let mut name = path.file_name().map( |n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}

/// remove file if it exists. Returns true if there was a file to remove
pub fn remove_file_if_exists (path: impl AsRef<Path>)->Result<bool> {
    match fs::remove_file( path.as_ref()) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e)
    }
}

/// remove empty directories from the parent of `path` upwards, stopping at (and not removing) `root`.
/// This is best effort - the first non-empty or non-removable dir ends the walk
pub fn remove_empty_parents (path: impl AsRef<Path>, root: impl AsRef<Path>) {
    let root = root.as_ref();
    let mut dir = path.as_ref().parent();

    while let Some(d) = dir {
        if d == root || !d.starts_with(root) { break }
        if fs::remove_dir(d).is_err() { break } // not empty (or gone)
        dir = d.parent();
    }
}
