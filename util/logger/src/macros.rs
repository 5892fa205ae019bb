// Copyright 2018 Vesper Project.
// This file is part of Vesper.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

#[macro_export]
macro_rules! log_target {
    (CASPER) => {
        "casper"
    };
    (CHAIN) => {
        "chain"
    };
    (CLIENT) => {
        "client"
    };
    (ENGINE) => {
        "engine"
    };
    (EXTERNAL_TX) => {
        "external_tx"
    };
    (IO) => {
        "io"
    };
    (MEM_POOL) => {
        "mem_pool"
    };
    (NET) => {
        "net"
    };
    (OWN_TX) => {
        "own_tx"
    };
    (SHUTDOWN) => {
        "shutdown"
    };
    (SYNC) => {
        "sync"
    };
    (VALIDATOR) => {
        "validator"
    };
}

#[macro_export]
macro_rules! vlog {
    ($target:ident, $lvl:expr, $($arg:tt)+) => ({
        log!(target: log_target!($target), $lvl, $($arg)*);
    });
}

#[macro_export]
macro_rules! verror {
    ($target:ident, $($arg:tt)*) => (
        vlog!($target, $crate::Level::Error, $($arg)*)
    );
}

#[macro_export]
macro_rules! vwarn {
    ($target:ident, $($arg:tt)*) => (
        vlog!($target, $crate::Level::Warn, $($arg)*)
    );
}

#[macro_export]
macro_rules! vinfo {
    ($target:ident, $($arg:tt)*) => (
        vlog!($target, $crate::Level::Info, $($arg)*)
    );
}

#[macro_export]
macro_rules! vdebug {
    ($target:ident, $($arg:tt)*) => (
        vlog!($target, $crate::Level::Debug, $($arg)*)
    );
}

#[macro_export]
macro_rules! vtrace {
    ($target:ident, $($arg:tt)*) => (
        vlog!($target, $crate::Level::Trace, $($arg)*)
    );
}
