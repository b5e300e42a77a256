//! Syscalls de arquivo: a ponte entre a tabela de descritores da tarefa
//! corrente e o VFS.

use crate::arch::TrapFrame;
use crate::fs::node::NodeKind;
use crate::fs::vfs::{self, File};
use crate::sched;
use crate::sys::KernelError;
use crate::syscall::{user_cstr, user_slice, user_slice_mut};

/// Retira uma cópia do arquivo do slot `fd` da tarefa corrente.
fn fetch_file(fd: usize) -> Result<File, KernelError> {
    sched::with_current(|task| {
        if fd >= task.files.len() {
            return Err(KernelError::InvalidArgument);
        }
        task.files[fd].clone().ok_or(KernelError::InvalidArgument)
    })?
}

/// Regrava o arquivo (posição atualizada) no slot `fd`.
fn store_file(fd: usize, file: File) -> Result<(), KernelError> {
    sched::with_current(|task| {
        task.files[fd] = Some(file);
    })
}

pub fn sys_open(frame: &mut TrapFrame) -> Result<isize, KernelError> {
    let path = user_cstr(frame.arg(0))?;
    let flags = frame.arg(1) as u32;

    let file = vfs::open(path, flags)?;
    let fd = sched::with_current(|task| {
        let fd = task.free_fd().ok_or(KernelError::NoMemory)?;
        task.files[fd] = Some(file);
        Ok(fd)
    })??;
    crate::kdebug!("(SYS) open concluido, fd=", fd);
    Ok(fd as isize)
}

pub fn sys_close(frame: &mut TrapFrame) -> Result<isize, KernelError> {
    let fd = frame.arg(0) as usize;
    let mut file = sched::with_current(|task| {
        if fd >= task.files.len() {
            return Err(KernelError::InvalidArgument);
        }
        task.files[fd].take().ok_or(KernelError::InvalidArgument)
    })??;
    file.close()?;
    Ok(0)
}

pub fn sys_write(frame: &mut TrapFrame) -> Result<isize, KernelError> {
    let fd = frame.arg(0) as usize;
    let len = frame.arg(2) as usize;
    let buf = user_slice(frame.arg(1), len)?;

    let mut file = fetch_file(fd)?;
    let written = file.write(buf)?;
    store_file(fd, file)?;
    Ok(written as isize)
}

pub fn sys_read(frame: &mut TrapFrame) -> Result<isize, KernelError> {
    let fd = frame.arg(0) as usize;
    let len = frame.arg(2) as usize;
    let buf = user_slice_mut(frame.arg(1), len)?;

    let mut file = fetch_file(fd)?;
    let read = file.read(buf)?;
    store_file(fd, file)?;
    Ok(read as isize)
}

pub fn sys_mkdir(frame: &mut TrapFrame) -> Result<isize, KernelError> {
    let path = user_cstr(frame.arg(0))?;
    vfs::mkdir(path)?;
    Ok(0)
}

pub fn sys_mount(frame: &mut TrapFrame) -> Result<isize, KernelError> {
    // Assinatura por convenção: (src, target, filesystem, flags, data);
    // só target e filesystem importam aqui.
    let target = user_cstr(frame.arg(1))?;
    let fs_name = user_cstr(frame.arg(2))?;
    vfs::mount(target, fs_name)?;
    Ok(0)
}

pub fn sys_chdir(frame: &mut TrapFrame) -> Result<isize, KernelError> {
    let path = user_cstr(frame.arg(0))?;
    let vnode = vfs::lookup(path)?;
    if vnode.node.kind != NodeKind::Directory {
        return Err(KernelError::InvalidArgument);
    }
    sched::with_current(|task| {
        task.cwd = Some(vnode);
    })?;
    Ok(0)
}

pub fn sys_lseek64(frame: &mut TrapFrame) -> Result<isize, KernelError> {
    let fd = frame.arg(0) as usize;
    let offset = frame.arg(1) as i64;
    let whence = frame.arg(2) as u32;

    let mut file = fetch_file(fd)?;
    let pos = file.seek(offset, whence)?;
    store_file(fd, file)?;
    Ok(pos as isize)
}

pub fn sys_ioctl(frame: &mut TrapFrame) -> Result<isize, KernelError> {
    let fd = frame.arg(0) as usize;
    let cmd = frame.arg(1);
    let arg = frame.arg(2);

    let mut file = fetch_file(fd)?;
    let ret = file.ioctl(cmd, arg)?;
    store_file(fd, file)?;
    Ok(ret as isize)
}
